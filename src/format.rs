use crate::error::{IncomeReportError, Result};
use log::warn;

/// Returned in place of an amount that could not be formatted.
pub const NOT_AVAILABLE: &str = "n/a";

const THOUSANDS_SEPARATOR: &str = " ";
const DECIMAL_SEPARATOR: &str = ".";

/// Formats an amount as `1 234 567.80`: two decimals, digits grouped in
/// threes with a space.
pub fn format_amount(amount: f64) -> Result<String> {
    if !amount.is_finite() {
        return Err(IncomeReportError::Format { value: amount });
    }

    let fixed = format!("{:.2}", amount);
    let (negative, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, fixed.as_str()),
    };
    let (int_part, dec_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    // "-0.00" reads as noise in a report
    let is_zero = unsigned.chars().all(|c| c == '0' || c == '.');
    let sign = if negative && !is_zero { "-" } else { "" };

    Ok(format!(
        "{}{}{}{}",
        sign,
        group_thousands(int_part),
        DECIMAL_SEPARATOR,
        dec_part
    ))
}

/// Like [`format_amount`], but never fails: a non-finite amount is logged
/// and rendered as [`NOT_AVAILABLE`] so one bad value does not sink a report.
pub fn format_amount_or_na(amount: f64) -> String {
    match format_amount(amount) {
        Ok(text) => text,
        Err(e) => {
            warn!("{}", e);
            NOT_AVAILABLE.to_string()
        }
    }
}

/// Whole thousands, truncated and grouped, for compact chart legends
/// (`1 234 567.8` becomes `1 234`).
pub fn format_thousands(amount: f64) -> String {
    if !amount.is_finite() {
        warn!("Cannot format amount {} in thousands", amount);
        return NOT_AVAILABLE.to_string();
    }
    let thousands = (amount / 1000.0).trunc() as i64;
    let digits = thousands.unsigned_abs().to_string();
    let sign = if thousands < 0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(&digits))
}

fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let head = chars.len() % 3;

    let mut groups: Vec<String> = Vec::new();
    if head > 0 {
        groups.push(chars[..head].iter().collect());
    }
    groups.extend(chars[head..].chunks(3).map(|chunk| chunk.iter().collect::<String>()));

    groups.join(THOUSANDS_SEPARATOR)
}
