use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

/// Colors the SQL the backend generated before it is echoed back
pub struct SqlHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl SqlHighlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// ANSI-escaped rendition of a SQL string, reset at the end.
    /// Falls back to the plain text when highlighting fails.
    pub fn highlight(&self, sql: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension("sql")
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let theme = &self.theme_set.themes["base16-ocean.dark"];
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut out = String::new();
        for line in LinesWithEndings::from(sql) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
                Err(_) => out.push_str(line),
            }
        }
        out.push_str("\x1b[0m");
        out
    }
}

impl Default for SqlHighlighter {
    fn default() -> Self {
        Self::new()
    }
}
