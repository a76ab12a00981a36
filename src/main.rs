use anyhow::{bail, Context, Result};
use autobi_cli::api_client::{ApiClient, HealthMonitor, QueryResponse};
use autobi_cli::cache::ResultCache;
use autobi_cli::config::config::Config;
use autobi_cli::data::exporter::{self, ExportFormat};
use autobi_cli::data::result_set::ResultSet;
use autobi_cli::data::stats::summary_cards;
use autobi_cli::data::view::ResultView;
use autobi_cli::history::{HistoryEntry, QueryHistory, QueryRecord};
use autobi_cli::sql_highlighter::SqlHighlighter;
use autobi_cli::suggest;
use autobi_cli::utils::app_paths::AppPaths;
use autobi_cli::utils::logging::init_logging;
use chrono::{Local, Utc};
use crossterm::style::Stylize;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, ValidationResult, Validator,
};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

mod completer;
mod table_display;

use completer::QuestionCompleter;

struct QuestionValidator;

impl Validator for QuestionValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim_end();
        // A trailing backslash continues the question on the next line
        if trimmed.ends_with('\\') && trimmed.len() > 1 {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

struct AutobiPrompt {
    healthy: Arc<AtomicBool>,
    table: Option<String>,
}

impl Prompt for AutobiPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let dot = if self.healthy.load(Ordering::Relaxed) {
            "●"
        } else {
            "○"
        };
        match &self.table {
            Some(table) => Cow::Owned(format!("{dot} autobi[{table}]")),
            None => Cow::Owned(format!("{dot} autobi")),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "> ".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => "N> ".into(),
                reedline::PromptViMode::Insert => "I> ".into(),
            },
            PromptEditMode::Custom(str) => format!("{str}> ").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

fn print_help() {
    println!(
        "{}",
        "AutoBI - Ask your data questions in plain English".blue().bold()
    );
    println!();
    println!("{}", "Keys:".yellow());
    println!("  {}  - Send the question", "Enter".green());
    println!("  {}    - Complete commands and questions", "Tab".green());
    println!("  {} - Search input history", "Ctrl+R".green());
    println!("  {} - Exit", "Ctrl+D".green());
    println!();
    println!("{}", "Commands:".yellow());
    for (cmd, desc) in completer::COMMANDS {
        println!("  {} - {}", format!("{cmd:<14}").green(), desc);
    }
    println!();
    println!("{}", "Try:".yellow());
    for question in suggest::EXAMPLE_QUESTIONS.iter().take(3) {
        println!("  {question}");
    }
    println!();
}

fn print_error(err: &anyhow::Error) {
    eprintln!("{}", format!("Error: {err:#}").red());
    tracing::error!("{err:#}");
}

/// Sanity-check a CSV file before shipping it to the backend. Returns the
/// column and data-row counts.
fn preflight_csv(path: &Path) -> Result<(usize, usize)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let headers = reader
        .headers()
        .context("File has no readable header row")?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        bail!("Header row is empty");
    }
    let mut rows = 0usize;
    for record in reader.records() {
        record.context("Malformed CSV record")?;
        rows += 1;
    }
    if rows == 0 {
        bail!("No data rows after the header");
    }
    Ok((headers.len(), rows))
}

/// Line-editor history, file-backed when the file opens; a bad path
/// degrades to in-memory history instead of aborting startup
fn open_line_history(limit: usize, path: PathBuf) -> FileBackedHistory {
    match FileBackedHistory::with_file(limit, path) {
        Ok(history) => history,
        Err(err) => {
            eprintln!("{}", format!("Line history not persisted: {err}").yellow());
            FileBackedHistory::default()
        }
    }
}

struct App {
    api: ApiClient,
    config: Config,
    history: QueryHistory,
    cache: Option<ResultCache>,
    highlighter: Option<SqlHighlighter>,
    table: Option<String>,
    view: Option<ResultView>,
    response: Option<QueryResponse>,
}

impl App {
    /// Send a question to the backend and present the answer. A failed
    /// request falls back to the result cache when a cached answer for the
    /// same question exists.
    fn ask(&mut self, question: &str) {
        info!("Question: {}", question);
        match self.api.query(question, self.table.as_deref()) {
            Ok(response) => {
                if self.config.history.enabled {
                    if let Err(err) = self.history.add(QueryRecord {
                        question: question.to_string(),
                        sql: response.sql.clone(),
                        row_count: response.row_count,
                        execution_time_ms: response.execution_time_ms,
                        confidence: response.confidence,
                    }) {
                        warn!("History not saved: {err:#}");
                    }
                }
                if let Some(cache) = self.cache.as_mut() {
                    if let Err(err) = cache.store(question, &response) {
                        warn!("Answer not cached: {err:#}");
                    }
                }
                self.present(response);
            }
            Err(err) => {
                print_error(&err);
                let cached = self.cache.as_ref().and_then(|c| c.lookup(question));
                if let Some(response) = cached {
                    println!(
                        "{}",
                        "Backend unavailable, showing a cached answer".yellow()
                    );
                    self.present(response);
                }
            }
        }
    }

    fn present(&mut self, response: QueryResponse) {
        println!();
        match &self.highlighter {
            Some(highlighter) => println!("{}", highlighter.highlight(&response.sql)),
            None => println!("{}", response.sql),
        }
        println!();

        let result = ResultSet::from_response(&response);
        let mut view = ResultView::new(result, self.config.display.page_size);
        let page = view.page();
        table_display::display_page(&page, &view.result().columns, view.state());

        let cards = summary_cards(view.result());
        table_display::display_stat_cards(&cards);
        table_display::display_insights(&response.insights);

        let chart = &response.chart_recommendation;
        if !chart.chart_type.is_empty() {
            println!(
                "  {}",
                format!("chart: {} ({})", chart.chart_type, chart.reasoning).dark_grey()
            );
        }
        for assumption in &response.assumptions {
            println!("  {}", format!("note: {assumption}").dark_grey());
        }
        println!(
            "{}",
            format!(
                "confidence {:.0}%, {:.0}ms",
                response.confidence * 100.0,
                response.execution_time_ms
            )
            .dark_grey()
        );

        self.view = Some(view);
        self.response = Some(response);
    }

    fn re_render(&mut self) {
        let view = match self.view.as_mut() {
            Some(view) => view,
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        };
        let page = view.page();
        table_display::display_page(&page, &view.result().columns, view.state());
    }

    /// Run one backslash command. Returns false when the session should end.
    fn dispatch(&mut self, line: &str) -> bool {
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };
        match cmd {
            "help" | "h" | "?" => print_help(),
            "clear" => print!("{esc}[2J{esc}[1;1H", esc = 27 as char),
            "quit" | "exit" | "q" => return false,
            "tables" => self.cmd_tables(),
            "schema" => self.cmd_schema(arg),
            "sample" => self.cmd_sample(arg),
            "use" => self.cmd_use(arg),
            "upload" => self.cmd_upload(arg),
            "search" => self.cmd_search(arg),
            "sort" => self.cmd_sort(arg),
            "page" => self.cmd_page(arg),
            "next" => {
                if let Some(view) = self.view.as_mut() {
                    view.next_page();
                }
                self.re_render();
            }
            "prev" => {
                if let Some(view) = self.view.as_mut() {
                    view.prev_page();
                }
                self.re_render();
            }
            "export" => self.cmd_export(arg),
            "copy" => self.cmd_copy(),
            "stats" => self.cmd_stats(),
            "insights" => self.cmd_insights(),
            "sql" => self.cmd_sql(),
            "history" => self.cmd_history(arg),
            "replay" => self.cmd_replay(arg),
            "rm" => self.cmd_rm(arg),
            "clear-history" => self.cmd_clear_history(),
            "cache" => self.cmd_cache(),
            "cache-clear" => self.cmd_cache_clear(),
            "health" => self.cmd_health(),
            _ => eprintln!(
                "{}",
                format!("Unknown command: \\{cmd} (\\help lists commands)").red()
            ),
        }
        true
    }

    fn cmd_tables(&self) {
        match self.api.tables() {
            Ok(tables) => table_display::display_tables(&tables),
            Err(err) => print_error(&err),
        }
    }

    fn cmd_schema(&self, table: &str) {
        if table.is_empty() {
            eprintln!("{}", "Usage: \\schema <table>".red());
            return;
        }
        match self.api.schema(table) {
            Ok(profile) => {
                let text = serde_json::to_string_pretty(&profile)
                    .unwrap_or_else(|_| profile.to_string());
                println!("{text}");
            }
            Err(err) => print_error(&err),
        }
    }

    fn cmd_sample(&self, table: &str) {
        if table.is_empty() {
            eprintln!("{}", "Usage: \\sample <table>".red());
            return;
        }
        match self.api.sample(table, 10) {
            Ok(sample) => {
                let result = ResultSet::from_columns_and_rows(&sample.columns, &sample.data);
                let mut view = ResultView::new(result, self.config.display.page_size);
                let page = view.page();
                table_display::display_page(&page, &view.result().columns, view.state());
            }
            Err(err) => print_error(&err),
        }
    }

    fn cmd_use(&mut self, table: &str) {
        if table.is_empty() {
            self.table = None;
            println!("{}", "Questions now run against all tables".green());
        } else {
            self.table = Some(table.to_string());
            println!(
                "{}",
                format!("Questions now run against '{table}'").green()
            );
        }
    }

    fn cmd_upload(&mut self, arg: &str) {
        if arg.is_empty() {
            eprintln!("{}", "Usage: \\upload <file.csv>".red());
            return;
        }
        let path = Path::new(arg);
        if !path.exists() {
            eprintln!("{}", format!("No such file: {arg}").red());
            return;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            eprintln!("{}", "Only .csv files can be uploaded".red());
            return;
        }
        match preflight_csv(path) {
            Ok((columns, rows)) => {
                println!("{}", format!("{columns} columns, {rows} rows").dark_grey());
            }
            Err(err) => {
                eprintln!("{}", format!("Not uploading: {err:#}").red());
                return;
            }
        }
        println!("Uploading {arg}...");
        match self.api.upload_csv(path) {
            Ok(uploaded) => {
                println!(
                    "{}",
                    format!(
                        "Loaded '{}' ({} rows)",
                        uploaded.table_name, uploaded.row_count
                    )
                    .green()
                );
                self.table = Some(uploaded.table_name);
            }
            Err(err) => print_error(&err),
        }
    }

    fn cmd_search(&mut self, term: &str) {
        match self.view.as_mut() {
            Some(view) => {
                view.set_search(term);
                if term.is_empty() {
                    println!("{}", "Search cleared".dark_grey());
                }
            }
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        }
        self.re_render();
    }

    fn cmd_sort(&mut self, column: &str) {
        if column.is_empty() {
            eprintln!("{}", "Usage: \\sort <column>".red());
            return;
        }
        match self.view.as_mut() {
            Some(view) => {
                if let Err(err) = view.toggle_sort(column) {
                    print_error(&err);
                    return;
                }
            }
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        }
        self.re_render();
    }

    fn cmd_page(&mut self, arg: &str) {
        let page = match arg.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                eprintln!("{}", "Usage: \\page <number>".red());
                return;
            }
        };
        match self.view.as_mut() {
            Some(view) => view.set_page(page),
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        }
        self.re_render();
    }

    fn cmd_export(&mut self, arg: &str) {
        let mut parts = arg.split_whitespace();
        let format = match parts.next().and_then(ExportFormat::parse) {
            Some(format) => format,
            None => {
                eprintln!("{}", "Usage: \\export <csv|json|tsv> [file]".red());
                return;
            }
        };
        let dest = parts.next().map(PathBuf::from);

        let view = match self.view.as_mut() {
            Some(view) => view,
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        };
        let columns = view.result().columns.clone();
        let rows = view.visible_rows();

        let export = match exporter::build_export(&columns, &rows, format, &Local::now()) {
            Ok(Some(export)) => export,
            Ok(None) => {
                println!("{}", "Nothing to export".yellow());
                return;
            }
            Err(err) => {
                print_error(&err);
                return;
            }
        };
        let count = rows.len();
        let path = dest.unwrap_or_else(|| PathBuf::from(&export.filename));
        match exporter::save_to_file(&export, &path) {
            Ok(()) => println!(
                "{}",
                format!("Exported {} rows to {}", count, path.display()).green()
            ),
            Err(err) => print_error(&err),
        }
    }

    fn cmd_copy(&mut self) {
        let view = match self.view.as_mut() {
            Some(view) => view,
            None => {
                println!("{}", "No result yet; ask a question first".yellow());
                return;
            }
        };
        let columns = view.result().columns.clone();
        let rows = view.visible_rows();
        let text = match exporter::tsv_text(&columns, &rows) {
            Some(text) => text,
            None => {
                println!("{}", "Nothing to copy".yellow());
                return;
            }
        };
        match exporter::copy_to_clipboard(&text) {
            Ok(()) => println!(
                "{}",
                format!("Copied {} rows to clipboard", rows.len()).green()
            ),
            Err(err) => print_error(&err),
        }
    }

    fn cmd_stats(&self) {
        match &self.view {
            Some(view) => {
                let cards = summary_cards(view.result());
                if cards.is_empty() {
                    println!("{}", "No summary for an empty result".yellow());
                } else {
                    table_display::display_stat_cards(&cards);
                }
            }
            None => println!("{}", "No result yet; ask a question first".yellow()),
        }
    }

    fn cmd_insights(&self) {
        match &self.response {
            Some(response) if !response.insights.is_empty() => {
                table_display::display_insights(&response.insights);
            }
            Some(_) => println!("{}", "No insights for this result".yellow()),
            None => println!("{}", "No result yet; ask a question first".yellow()),
        }
    }

    fn cmd_sql(&self) {
        match &self.response {
            Some(response) => match &self.highlighter {
                Some(highlighter) => println!("{}", highlighter.highlight(&response.sql)),
                None => println!("{}", response.sql),
            },
            None => println!("{}", "No query yet".yellow()),
        }
    }

    fn cmd_history(&self, term: &str) {
        let now_ms = Utc::now().timestamp_millis();
        if term.is_empty() {
            table_display::display_history(self.history.entries(), now_ms);
            return;
        }
        let matches = self.history.search(term);
        if matches.is_empty() {
            println!("{}", format!("No questions matching '{term}'").yellow());
            return;
        }
        let entries: Vec<HistoryEntry> = matches.into_iter().map(|m| m.entry).collect();
        table_display::display_history(&entries, now_ms);
    }

    fn cmd_replay(&mut self, arg: &str) {
        let index = match arg.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                eprintln!("{}", "Usage: \\replay <number> (numbers from \\history)".red());
                return;
            }
        };
        let question = match self.history.entries().get(index) {
            Some(entry) => entry.question.clone(),
            None => {
                eprintln!("{}", format!("No history entry {}", index + 1).red());
                return;
            }
        };
        println!("{}", format!("> {question}").dark_grey());
        self.ask(&question);
    }

    fn cmd_rm(&mut self, arg: &str) {
        let index = match arg.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                eprintln!("{}", "Usage: \\rm <number> (numbers from \\history)".red());
                return;
            }
        };
        let id = match self.history.entries().get(index) {
            Some(entry) => entry.id.clone(),
            None => {
                eprintln!("{}", format!("No history entry {}", index + 1).red());
                return;
            }
        };
        match self.history.remove(&id) {
            Ok(true) => println!("{}", "Forgotten".green()),
            Ok(false) => println!("{}", "Already gone".yellow()),
            Err(err) => print_error(&err),
        }
    }

    fn cmd_clear_history(&mut self) {
        match self.history.clear() {
            Ok(()) => println!("{}", "History cleared".green()),
            Err(err) => print_error(&err),
        }
    }

    fn cmd_cache(&self) {
        match &self.cache {
            Some(cache) => table_display::display_cached(cache.list()),
            None => println!("{}", "Result cache is disabled".yellow()),
        }
    }

    fn cmd_cache_clear(&mut self) {
        match self.cache.as_mut() {
            Some(cache) => match cache.clear() {
                Ok(()) => println!("{}", "Cache cleared".green()),
                Err(err) => print_error(&err),
            },
            None => println!("{}", "Result cache is disabled".yellow()),
        }
    }

    fn cmd_health(&self) {
        match self.api.health() {
            Ok(health) if health.status == "healthy" => {
                println!(
                    "{}",
                    format!("Backend healthy (version {})", health.version).green()
                );
            }
            Ok(health) => {
                println!("{}", format!("Backend degraded: {}", health.status).yellow());
            }
            Err(err) => print_error(&err),
        }
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("autobi {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--generate-config") {
        let path = Config::get_config_path()?;
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::create_default_with_comments())?;
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    match init_logging() {
        Ok(path) => println!("{}", format!("Session log: {}", path.display()).dark_grey()),
        Err(err) => eprintln!("{}", format!("Logging disabled: {err:#}").yellow()),
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{}",
                format!("Config error, using defaults: {err:#}").yellow()
            );
            Config::default()
        }
    };

    let api_url = std::env::var("AUTOBI_API_URL").unwrap_or_else(|_| config.api.url.clone());

    let api = ApiClient::new(&api_url, Duration::from_secs(config.api.timeout_secs))?;
    let health_client = ApiClient::new(&api_url, Duration::from_secs(config.api.health_timeout_secs))?;
    let monitor = HealthMonitor::start(
        health_client,
        Duration::from_secs(config.api.health_interval_secs),
    );

    let mut history = QueryHistory::open(AppPaths::history_file()?, config.history.limit.max(1));
    let questions = Arc::new(Mutex::new(history.questions()));
    {
        let questions = Arc::clone(&questions);
        history.subscribe(move |entries| {
            if let Ok(mut shared) = questions.lock() {
                *shared = entries.iter().map(|e| e.question.clone()).collect();
            }
        });
    }

    let cache = if config.cache.enabled {
        let dir = match &config.cache.dir {
            Some(dir) => dir.clone(),
            None => AppPaths::cache_dir()?.join("results"),
        };
        match ResultCache::open(dir) {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!("Result cache disabled: {err:#}");
                None
            }
        }
    } else {
        None
    };

    let highlighter = config.display.syntax_highlighting.then(SqlHighlighter::new);

    println!("{}", "AutoBI".blue().bold());
    println!("Ask questions in plain English. \\help lists commands, Tab completes.");
    match api.health() {
        Ok(health) if health.status == "healthy" => {
            println!(
                "{}",
                format!("Connected to {} (backend {})", api_url, health.version).cyan()
            );
        }
        _ => {
            println!(
                "{}",
                format!(
                    "Backend at {} is not answering; cached answers still work",
                    api_url
                )
                .yellow()
            );
        }
    }

    let line_history = Box::new(open_line_history(
        config.history.limit.max(1),
        AppPaths::line_history_file()?,
    ));

    let completer = Box::new(QuestionCompleter::new(Arc::clone(&questions)));

    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("question_completion")
            .with_columns(1)
            .with_column_width(None)
            .with_column_padding(2),
    );

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Menu("question_completion".to_string()),
    );

    let edit_mode = Box::new(Emacs::new(keybindings));

    let mut line_editor = Reedline::create()
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_validator(Box::new(QuestionValidator))
        .with_history(line_history)
        .with_edit_mode(edit_mode);

    let mut prompt = AutobiPrompt {
        healthy: monitor.status_flag(),
        table: None,
    };

    let mut app = App {
        api,
        config,
        history,
        cache,
        highlighter,
        table: None,
        view: None,
        response: None,
    };

    loop {
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                let joined = buffer.replace("\\\n", " ");
                let line = joined.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(command) = line.strip_prefix('\\') {
                    if !app.dispatch(command) {
                        println!("Goodbye!");
                        break;
                    }
                    prompt.table = app.table.clone();
                } else {
                    app.ask(line);
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                println!("\nGoodbye!");
                break;
            }
        }
    }

    drop(monitor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn line_history_degrades_when_the_file_cannot_open() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        // Parent is a regular file, so the history file cannot be created
        let _history = open_line_history(50, blocker.join("history.txt"));
    }
}
