use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Hard cap on candidates offered per keystroke
pub const MAX_SUGGESTIONS: usize = 5;

/// Fallback pool shown alongside history questions
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What is the total revenue?",
    "Show sales by region",
    "Top 10 products by revenue",
    "How many orders per month?",
    "Average order value by category",
    "Show trends over time",
];

static TRIGGERS: OnceLock<Vec<(Regex, Vec<&'static str>)>> = OnceLock::new();

/// Ordered trigger table: an input consisting solely of one of these
/// keywords (plus optional whitespace) short-circuits to a fixed list
fn trigger_patterns() -> &'static Vec<(Regex, Vec<&'static str>)> {
    TRIGGERS.get_or_init(|| {
        vec![
            (
                Regex::new(r"(?i)^\s*show\s*$").unwrap(),
                vec![
                    "Show all data",
                    "Show me sales by region",
                    "Show trends over time",
                    "Show the top performers",
                ],
            ),
            (
                Regex::new(r"(?i)^\s*total\s*$").unwrap(),
                vec![
                    "Total revenue by month",
                    "Total sales by category",
                    "Total count of records",
                ],
            ),
            (
                Regex::new(r"(?i)^\s*top\s*$").unwrap(),
                vec![
                    "Top 10 products by sales",
                    "Top 5 regions by revenue",
                    "Top customers by order count",
                ],
            ),
            (
                Regex::new(r"(?i)^\s*by\s*$").unwrap(),
                vec![
                    "Sales by region",
                    "Revenue by month",
                    "Orders by status",
                    "Average price by category",
                ],
            ),
            (
                Regex::new(r"(?i)^\s*compare\s*$").unwrap(),
                vec![
                    "Compare sales across regions",
                    "Compare revenue by quarter",
                    "Compare this month to last month",
                ],
            ),
        ]
    })
}

/// Candidate questions for a partial input. Trigger keywords return their
/// fixed list immediately; otherwise history questions (newest first) and
/// the example pool are matched by case-insensitive substring, skipping
/// anything equal to the input itself.
pub fn suggest(input: &str, history_questions: &[String]) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    for (pattern, candidates) in trigger_patterns() {
        if pattern.is_match(input) {
            return candidates.iter().map(|s| s.to_string()).collect();
        }
    }

    let needle = trimmed.to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let pool = history_questions
        .iter()
        .map(String::as_str)
        .chain(EXAMPLE_QUESTIONS.iter().copied());

    for candidate in pool {
        let lower = candidate.to_lowercase();
        if !seen.insert(lower.clone()) {
            continue;
        }
        if lower.contains(&needle) && lower != needle {
            out.push(candidate.to_string());
            if out.len() == MAX_SUGGESTIONS {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_yields_nothing() {
        assert!(suggest("", &[]).is_empty());
        assert!(suggest("   ", &[]).is_empty());
    }

    #[test]
    fn test_trigger_ignores_case_and_whitespace() {
        let plain = suggest("show", &[]);
        assert_eq!(suggest("  SHOW  ", &[]), plain);
        assert!(!plain.is_empty());
    }

    #[test]
    fn test_input_itself_is_never_suggested() {
        let history = vec!["Show sales by region".to_string()];
        let out = suggest("Show sales by region", &history);
        assert!(out.iter().all(|s| !s.eq_ignore_ascii_case("Show sales by region")));
    }
}
