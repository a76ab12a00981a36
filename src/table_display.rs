use autobi_cli::api_client::{Insight, TableInfo};
use autobi_cli::cache::CachedResult;
use autobi_cli::data::format::format_label;
use autobi_cli::data::result_set::Column;
use autobi_cli::data::stats::{StatCard, Trend};
use autobi_cli::data::view::{RenderedPage, ViewState};
use autobi_cli::history::{relative_age, HistoryEntry};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;

/// Render one page of a result as a table, with the sort indicator on the
/// active column and a pagination footer.
pub fn display_page(page: &RenderedPage, columns: &[Column], state: &ViewState) {
    if page.total_filtered == 0 {
        if state.search_term.is_empty() {
            println!("{}", "Query returned no rows".yellow());
        } else {
            println!(
                "{}",
                format!("No rows match '{}'", state.search_term).yellow()
            );
        }
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = columns
        .iter()
        .map(|col| {
            let mut label = format_label(&col.name);
            if state.sort_column.as_deref() == Some(col.name.as_str()) {
                let glyph = state.sort_direction.indicator();
                if !glyph.is_empty() {
                    label = format!("{} {}", label, glyph);
                }
            }
            Cell::new(label).add_attribute(Attribute::Bold)
        })
        .collect();
    table.set_header(header);

    for row in &page.rows {
        table.add_row(row.clone());
    }

    println!("{table}");

    let mut footer = format!(
        "Page {} of {} ({} rows)",
        page.page + 1,
        page.total_pages,
        page.total_filtered
    );
    if !state.search_term.is_empty() {
        footer.push_str(&format!(" matching '{}'", state.search_term));
    }
    println!("{}", footer.green());
}

/// Render the summary cards as a compact strip: labels on top, headline
/// values in the middle, secondary lines underneath.
pub fn display_stat_cards(cards: &[StatCard]) {
    if cards.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = cards
        .iter()
        .map(|card| Cell::new(&card.label).add_attribute(Attribute::Bold))
        .collect();
    table.set_header(header);

    let values: Vec<String> = cards
        .iter()
        .map(|card| {
            let glyph = match card.trend {
                Some(Trend::Up) => " ^",
                Some(Trend::Down) => " v",
                _ => "",
            };
            format!("{}{}", card.value, glyph)
        })
        .collect();
    table.add_row(values);

    if cards.iter().any(|card| card.sub_value.is_some()) {
        let subs: Vec<String> = cards
            .iter()
            .map(|card| card.sub_value.clone().unwrap_or_default())
            .collect();
        table.add_row(subs);
    }

    println!("{table}");
}

/// Print insights as a prioritised list. High priority gets a red marker,
/// medium yellow, everything else green.
pub fn display_insights(insights: &[Insight]) {
    if insights.is_empty() {
        return;
    }
    println!("{}", "Insights:".bold());
    for insight in insights {
        let marker = match insight.priority.as_str() {
            "high" => "!".red(),
            "medium" => "*".yellow(),
            _ => "-".green(),
        };
        println!("  {} {}", marker, insight.title.as_str().bold());
        if !insight.description.is_empty() {
            println!("    {}", insight.description.as_str().dark_grey());
        }
    }
}

/// List history entries newest first, numbered from 1 so the numbers can be
/// fed back to \replay and \rm.
pub fn display_history(entries: &[HistoryEntry], now_ms: i64) {
    if entries.is_empty() {
        println!("{}", "No questions asked yet".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("When").add_attribute(Attribute::Bold),
        Cell::new("Question").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
    ]);

    for (i, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            relative_age(now_ms, entry.timestamp_ms),
            entry.question.clone(),
            entry.row_count.to_string(),
            format!("{}ms", entry.execution_time_ms),
        ]);
    }

    println!("{table}");
}

pub fn display_tables(tables: &[TableInfo]) {
    if tables.is_empty() {
        println!("{}", "No tables loaded; upload a CSV with \\upload".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Table").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
        Cell::new("Columns").add_attribute(Attribute::Bold),
    ]);

    for info in tables {
        let column_names: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
        table.add_row(vec![
            info.name.clone(),
            info.row_count.to_string(),
            column_names.join(", "),
        ]);
    }

    println!("{table}");
    println!("{}", format!("{} tables", tables.len()).green());
}

pub fn display_cached(results: &[CachedResult]) {
    if results.is_empty() {
        println!("{}", "Cache is empty".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("When").add_attribute(Attribute::Bold),
        Cell::new("Question").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
    ]);

    for cached in results {
        table.add_row(vec![
            cached.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            cached.question.clone(),
            cached.row_count.to_string(),
        ]);
    }

    println!("{table}");
}
