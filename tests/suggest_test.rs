use autobi_cli::suggest::{suggest, EXAMPLE_QUESTIONS, MAX_SUGGESTIONS};

#[test]
fn bare_keyword_returns_its_fixed_list_verbatim() {
    let out = suggest("show", &[]);
    assert_eq!(
        out,
        vec![
            "Show all data",
            "Show me sales by region",
            "Show trends over time",
            "Show the top performers",
        ]
    );

    let out = suggest("top", &[]);
    assert_eq!(
        out,
        vec![
            "Top 10 products by sales",
            "Top 5 regions by revenue",
            "Top customers by order count",
        ]
    );
}

#[test]
fn keyword_with_more_words_is_not_a_trigger() {
    // "show me" is a substring search, not the fixed "show" list
    let out = suggest("show me", &[]);
    assert!(out.iter().all(|s| s != "Show all data"));
}

#[test]
fn history_comes_before_the_example_pool() {
    let history = vec![
        "Monthly revenue by region".to_string(),
        "Best revenue quarter".to_string(),
    ];
    let out = suggest("revenue", &history);

    assert_eq!(out[0], "Monthly revenue by region");
    assert_eq!(out[1], "Best revenue quarter");
    // Example pool entries follow the history hits
    assert!(out.contains(&"What is the total revenue?".to_string()));
}

#[test]
fn matches_are_capped() {
    let history: Vec<String> = (0..10).map(|i| format!("sales report {i}")).collect();
    let out = suggest("sales", &history);
    assert_eq!(out.len(), MAX_SUGGESTIONS);
    assert_eq!(out[0], "sales report 0");
}

#[test]
fn duplicate_questions_appear_once() {
    // The same text in history and the example pool is offered once
    let history = vec!["Show trends over time".to_string()];
    let out = suggest("trends", &history);
    let hits = out.iter().filter(|s| *s == "Show trends over time").count();
    assert_eq!(hits, 1);
}

#[test]
fn exact_match_is_excluded_case_insensitively() {
    let history = vec!["Show sales by region".to_string()];
    let out = suggest("SHOW SALES BY REGION", &history);
    assert!(out.iter().all(|s| !s.eq_ignore_ascii_case("Show sales by region")));
}

#[test]
fn example_pool_backs_an_empty_history() {
    let out = suggest("order", &[]);
    assert!(!out.is_empty());
    for suggestion in &out {
        assert!(EXAMPLE_QUESTIONS.contains(&suggestion.as_str()));
    }
}
