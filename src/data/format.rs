use crate::data::result_set::{CellValue, SemanticType};

/// Placeholder shown for null cells
pub const NULL_PLACEHOLDER: &str = "-";

/// Compact human-readable number format shared by stat cards and insights.
/// Millions and thousands get a one-decimal suffix, sub-unit values keep
/// three decimals, everything else is grouped with up to two decimals.
pub fn format_number(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value.abs() >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else if value != 0.0 && value.abs() < 1.0 {
        format!("{:.3}", value)
    } else {
        let fixed = group_thousands(&format!("{:.2}", value));
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Fixed 2-decimal grouped format used for measure cells in the table view
pub fn format_measure(value: f64) -> String {
    group_thousands(&format!("{:.2}", value))
}

/// Grouped integer, used for row counts
pub fn format_count(count: usize) -> String {
    group_thousands(&count.to_string())
}

/// Render one cell for display
pub fn format_cell(value: &CellValue, semantic_type: SemanticType) -> String {
    match value {
        CellValue::Null => NULL_PLACEHOLDER.to_string(),
        CellValue::Number(n) if semantic_type == SemanticType::Measure => format_measure(*n),
        other => other.to_string(),
    }
}

/// Turn a column name into a display label: underscores to spaces,
/// each word capitalized
pub fn format_label(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn group_thousands(formatted: &str) -> String {
    let (sign, magnitude) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match magnitude.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (magnitude, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let digits = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millions_and_thousands_suffixes() {
        assert_eq!(format_number(1_500_000.0), "1.5M");
        assert_eq!(format_number(-2_400_000.0), "-2.4M");
        assert_eq!(format_number(2_300.0), "2.3K");
        assert_eq!(format_number(999_950.0), "1000.0K");
    }

    #[test]
    fn test_sub_unit_values_keep_three_decimals() {
        assert_eq!(format_number(0.1234), "0.123");
        assert_eq!(format_number(-0.5), "-0.500");
    }

    #[test]
    fn test_plain_values_trim_trailing_zeros() {
        assert_eq!(format_number(600.0), "600");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(123.4), "123.4");
        assert_eq!(format_number(123.45), "123.45");
    }

    #[test]
    fn test_measure_format_keeps_two_decimals() {
        assert_eq!(format_measure(1234.5), "1,234.50");
        assert_eq!(format_measure(-1234567.0), "-1,234,567.00");
        assert_eq!(format_measure(42.0), "42.00");
    }

    #[test]
    fn test_count_is_grouped() {
        assert_eq!(format_count(1500), "1,500");
        assert_eq!(format_count(42), "42");
    }

    #[test]
    fn test_label_formatting() {
        assert_eq!(format_label("total_revenue"), "Total Revenue");
        assert_eq!(format_label("region"), "Region");
        assert_eq!(format_label("avg_order_VALUE"), "Avg Order Value");
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(
            format_cell(&CellValue::Null, SemanticType::Dimension),
            NULL_PLACEHOLDER
        );
        assert_eq!(
            format_cell(&CellValue::Number(1234.5), SemanticType::Measure),
            "1,234.50"
        );
        assert_eq!(
            format_cell(&CellValue::Number(1234.5), SemanticType::Dimension),
            "1234.5"
        );
        assert_eq!(
            format_cell(&CellValue::Text("West".into()), SemanticType::Dimension),
            "West"
        );
    }
}
