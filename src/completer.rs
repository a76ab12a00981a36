use autobi_cli::suggest;
use reedline::{Completer, Span, Suggestion};
use std::sync::{Arc, Mutex};

/// Backslash commands with their menu descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("\\help", "Show help"),
    ("\\clear", "Clear screen"),
    ("\\tables", "List tables"),
    ("\\schema", "Show a table's schema profile"),
    ("\\sample", "Preview rows from a table"),
    ("\\use", "Pin questions to a table"),
    ("\\upload", "Upload a CSV file"),
    ("\\search", "Filter the current result"),
    ("\\sort", "Sort by a column (cycles)"),
    ("\\page", "Jump to a page"),
    ("\\next", "Next page"),
    ("\\prev", "Previous page"),
    ("\\export", "Export to csv or json"),
    ("\\copy", "Copy current rows to clipboard"),
    ("\\stats", "Show summary cards"),
    ("\\insights", "Show insights again"),
    ("\\sql", "Show the generated SQL"),
    ("\\history", "List or search asked questions"),
    ("\\replay", "Re-ask a question from history"),
    ("\\rm", "Forget one history entry"),
    ("\\clear-history", "Forget all history"),
    ("\\cache", "List cached answers"),
    ("\\cache-clear", "Drop cached answers"),
    ("\\health", "Check the backend"),
    ("\\quit", "Exit"),
];

/// Completes backslash commands and, for plain text, whole questions
/// from history and the example pool
pub struct QuestionCompleter {
    history_questions: Arc<Mutex<Vec<String>>>,
}

impl QuestionCompleter {
    pub fn new(history_questions: Arc<Mutex<Vec<String>>>) -> Self {
        Self { history_questions }
    }
}

impl Completer for QuestionCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let input = &line[..pos];

        if input.starts_with('\\') {
            return COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Suggestion {
                    value: cmd.to_string(),
                    description: Some(desc.to_string()),
                    extra: None,
                    span: Span { start: 0, end: pos },
                    style: None,
                    append_whitespace: true,
                })
                .collect();
        }

        let questions = self
            .history_questions
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone();
        suggest::suggest(input, &questions)
            .into_iter()
            .map(|value| Suggestion {
                value,
                description: None,
                extra: None,
                span: Span { start: 0, end: pos },
                style: None,
                append_whitespace: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_survive_a_poisoned_history_lock() {
        let questions = Arc::new(Mutex::new(vec!["Show sales by region".to_string()]));
        let poisoner = Arc::clone(&questions);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let mut completer = QuestionCompleter::new(questions);
        let out = completer.complete("sales", 5);
        assert!(out.iter().any(|s| s.value == "Show sales by region"));
    }

    #[test]
    fn backslash_input_completes_commands() {
        let questions = Arc::new(Mutex::new(Vec::new()));
        let mut completer = QuestionCompleter::new(questions);

        let out = completer.complete("\\hi", 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, "\\history");
        assert_eq!(out[0].span, Span { start: 0, end: 3 });
    }
}
