//! Numeric-cell parsing and currency-style formatting.
//!
//! Spreadsheet cells arrive as strings that may carry dollar signs, thousands
//! separators, or garbage. A cell that does not parse is worth zero, never an
//! error, so that one bad cell cannot take down a whole report.

use format_num::NumberFormat;

/// Parses a spend cell, tolerating `$` and comma decorations. Malformed or
/// empty cells are zero.
pub(crate) fn parse_spend_cell(cell: &str) -> f64 {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Formats a value as a currency string for command output, e.g. `-$1,234.00`.
/// The sign goes outside the dollar sign, matching the report surface.
pub fn format_currency(value: f64) -> String {
    let num = NumberFormat::new();
    let formatted = num.format(",.2f", value.abs());
    if value < 0.0 {
        format!("-${formatted}")
    } else {
        format!("${formatted}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_number() {
        assert_eq!(parse_spend_cell("12.5"), 12.5);
    }

    #[test]
    fn parse_dollar_and_commas() {
        assert_eq!(parse_spend_cell("$1,234.50"), 1234.5);
        assert_eq!(parse_spend_cell(" -$60,000.00 "), -60000.0);
    }

    #[test]
    fn parse_malformed_is_zero() {
        assert_eq!(parse_spend_cell(""), 0.0);
        assert_eq!(parse_spend_cell("n/a"), 0.0);
        assert_eq!(parse_spend_cell("12abc"), 0.0);
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(15.0), "$15.00");
        assert_eq!(format_currency(-135.0), "-$135.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
    }
}
