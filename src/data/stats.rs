use crate::data::format::{format_count, format_label, format_number};
use crate::data::result_set::ResultSet;

/// Direction glyph carried by a stat card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// One summary card: a label, a formatted headline value, an optional
/// secondary line and an optional trend
#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    pub sub_value: Option<String>,
    pub trend: Option<Trend>,
}

/// Derive up to four summary cards from a result. Never errors; an empty
/// result yields no cards and each step is skipped when its inputs are
/// insufficient.
pub fn summary_cards(result: &ResultSet) -> Vec<StatCard> {
    let mut cards = Vec::new();
    if result.is_empty() {
        return cards;
    }

    cards.push(StatCard {
        label: "Total Rows".to_string(),
        value: format_count(result.row_count()),
        sub_value: None,
        trend: Some(Trend::Neutral),
    });

    let measures = result.measure_columns();

    if let Some(&(m0_idx, m0)) = measures.first() {
        let values = numeric_values(result, m0_idx);
        if !values.is_empty() {
            let sum: f64 = values.iter().sum();
            let mean = sum / values.len() as f64;
            cards.push(StatCard {
                label: format!("Total {}", format_label(&m0.name)),
                value: format_number(sum),
                sub_value: Some(format!("Avg: {}", format_number(mean))),
                trend: None,
            });
        }
    }

    if let Some(&(m1_idx, m1)) = measures.get(1) {
        let values = numeric_values(result, m1_idx);
        if !values.is_empty() {
            let sum: f64 = values.iter().sum();
            let mean = sum / values.len() as f64;
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            cards.push(StatCard {
                label: format!("Average {}", format_label(&m1.name)),
                value: format_number(mean),
                sub_value: Some(format!("{}–{}", format_number(min), format_number(max))),
                trend: None,
            });
        }
    }

    if let Some(&(m0_idx, _)) = measures.first() {
        if let Some(card) = change_card(result, m0_idx) {
            cards.push(card);
        }
    }

    cards.truncate(4);
    cards
}

/// Percent change from the first row's value to the last row's value.
/// Needs at least two rows, numeric endpoints, and a non-zero start.
fn change_card(result: &ResultSet, col_idx: usize) -> Option<StatCard> {
    if result.row_count() < 2 {
        return None;
    }
    let first = result.rows.first()?.get(col_idx)?.as_number()?;
    let last = result.rows.last()?.get(col_idx)?.as_number()?;
    if first == 0.0 {
        return None;
    }
    let change = (last - first) / first.abs() * 100.0;
    Some(StatCard {
        label: "Change".to_string(),
        value: format!("{:+.1}%", change),
        sub_value: Some(format!(
            "{} → {}",
            format_number(first),
            format_number(last)
        )),
        trend: Some(if change >= 0.0 { Trend::Up } else { Trend::Down }),
    })
}

/// Numeric values of one column; nulls and non-numeric cells are excluded
/// from both numerator and denominator of any average
fn numeric_values(result: &ResultSet, col_idx: usize) -> Vec<f64> {
    result
        .rows
        .iter()
        .filter_map(|row| row.get(col_idx).and_then(|v| v.as_number()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::result_set::{CellValue, Column};

    #[test]
    fn test_empty_result_yields_no_cards() {
        let rs = ResultSet::new(vec![Column::measure("revenue")], vec![]);
        assert!(summary_cards(&rs).is_empty());
    }

    #[test]
    fn test_non_numeric_values_excluded_from_mean() {
        let rs = ResultSet::new(
            vec![Column::measure("revenue")],
            vec![
                vec![CellValue::Number(100.0)],
                vec![CellValue::Null],
                vec![CellValue::Text("n/a".into())],
                vec![CellValue::Number(300.0)],
            ],
        );
        let cards = summary_cards(&rs);
        let total = &cards[1];
        assert_eq!(total.value, "400");
        assert_eq!(total.sub_value.as_deref(), Some("Avg: 200"));
    }

    #[test]
    fn test_all_null_measure_skips_card_but_keeps_row_count() {
        let rs = ResultSet::new(
            vec![Column::measure("revenue")],
            vec![vec![CellValue::Null], vec![CellValue::Null]],
        );
        let cards = summary_cards(&rs);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].label, "Total Rows");
    }
}
