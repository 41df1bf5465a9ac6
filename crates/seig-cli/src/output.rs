// crates/seig-cli/src/output.rs
//
// Output formatting utilities for the seig CLI.
// Supports table and JSON output modes, plus decimal token amounts.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print `rows` as a table, or `raw` as JSON.
pub fn emit<T: Tabled, R: Serialize>(format: OutputFormat, rows: &[T], raw: &R) {
    match format {
        OutputFormat::Table => println!("{}", format_table(rows)),
        OutputFormat::Json => println!("{}", format_json(raw)),
    }
}

/// Parse a decimal token amount such as `"12.5"` into smallest units.
pub fn parse_units(value: &str, decimals: u32) -> Result<u128, String> {
    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid amount '{}'", value));
    }
    if frac.len() > decimals as usize {
        return Err(format!(
            "amount '{}' has more than {} decimal places",
            value, decimals
        ));
    }
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits(whole) || !digits(frac) {
        return Err(format!("invalid amount '{}'", value));
    }

    let scale = 10u128.pow(decimals);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("invalid amount '{}'", value))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| format!("invalid amount '{}'", value))?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| format!("amount '{}' is too large", value))
}

/// Render smallest units as a decimal token string, trimming trailing zeros.
pub fn format_units(amount: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac = format!("{:0width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seig_core::{BASE_DECIMALS, BASE_ONE, WRAPPED_DECIMALS, WRAPPED_ONE};

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units("3", WRAPPED_DECIMALS).unwrap(), 3 * WRAPPED_ONE);
        assert_eq!(parse_units("0.5", BASE_DECIMALS).unwrap(), BASE_ONE / 2);
        assert_eq!(parse_units(".25", BASE_DECIMALS).unwrap(), BASE_ONE / 4);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_units("", BASE_DECIMALS).is_err());
        assert!(parse_units("1e5", BASE_DECIMALS).is_err());
        assert!(parse_units("-1", BASE_DECIMALS).is_err());
        assert!(parse_units("0.0000000000000000001", BASE_DECIMALS).is_err());
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_units("1000000000000000000000", WRAPPED_DECIMALS).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(WRAPPED_ONE * 7 / 4, WRAPPED_DECIMALS), "1.75");
        assert_eq!(format_units(2 * BASE_ONE, BASE_DECIMALS), "2");
        assert_eq!(format_units(1, BASE_DECIMALS), "0.000000000000000001");
    }
}
