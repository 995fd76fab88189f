//! Numeric string parsing for extracted financial values.
//!
//! Raw cell text arrives with currency symbols, thousands separators
//! (US commas or European dots), parenthesised negatives, and layout
//! separator dashes ("Energy -- 7.1%"). A dash followed by whitespace is a
//! separator, not a sign; a bare leading dash on a percent is suspicious.

use regex::Regex;
use rust_decimal::Decimal;

/// Outcome of parsing one raw numeric string.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// No numeric content at all (empty, dashes, prose).
    Empty,
    /// A single clean numeric value.
    Value(Decimal),
    /// A value whose negativity came from a bare leading dash rather than
    /// parentheses. Parentheses are the canonical negative in filings, so
    /// a dash sign on a percent field usually means a separator leaked in.
    DashNegative(Decimal),
    /// More than one numeric token — an extraction artifact, unusable.
    MultipleTokens,
    /// A numeric token the decimal parser rejected.
    Malformed,
}

impl Parsed {
    /// The parsed value, if any. `DashNegative` still yields its value;
    /// callers that care about the provenance match on the variant.
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Value(d) | Self::DashNegative(d) => Some(*d),
            _ => None,
        }
    }
}

const CURRENCY_CODES: [&str; 5] = ["USD", "CAD", "EUR", "GBP", "JPY"];

/// Parse a raw amount/percent string into a `Decimal`.
pub fn parse_decimal(raw: &str) -> Parsed {
    let mut value_str = raw.trim().to_string();
    if value_str.is_empty() {
        return Parsed::Empty;
    }

    // A dash run followed by whitespace and then a digit is a layout
    // separator; keep only the numeric tail.
    let separator_dash = Regex::new(r"[-\u{2013}\u{2014}]+\s+(\d)").unwrap();
    if let Some(m) = separator_dash.captures(&value_str) {
        let digit_start = m.get(1).unwrap().start();
        value_str = value_str[digit_start..].trim().to_string();
    }

    let mut cleaned: String = value_str
        .chars()
        .filter(|c| !matches!(c, '$' | '\u{20ac}' | '\u{a3}' | '\u{a5}') && !c.is_whitespace())
        .collect();
    for code in CURRENCY_CODES {
        cleaned = cleaned.replace(code, "");
    }
    cleaned = cleaned.replace('%', "");

    let negative_by_parens = cleaned.starts_with('(') && cleaned.ends_with(')');
    if negative_by_parens {
        cleaned = cleaned[1..cleaned.len() - 1].trim().to_string();
    }

    let negative_by_dash = !negative_by_parens && cleaned.starts_with('-');
    if negative_by_dash {
        cleaned = cleaned[1..].trim().to_string();
    }

    let number_pattern = Regex::new(r"\d[\d.,]*").unwrap();
    let tokens: Vec<&str> = number_pattern
        .find_iter(&cleaned)
        .map(|m| m.as_str())
        .collect();

    if tokens.is_empty() {
        return Parsed::Empty;
    }
    if tokens.len() > 1 {
        return Parsed::MultipleTokens;
    }

    let num_str = normalize_separators(tokens[0]);
    let mut number: Decimal = match num_str.parse() {
        Ok(d) => d,
        Err(_) => return Parsed::Malformed,
    };

    if (negative_by_parens || negative_by_dash) && number > Decimal::ZERO {
        number = -number;
    }

    if negative_by_dash {
        Parsed::DashNegative(number)
    } else {
        Parsed::Value(number)
    }
}

/// Resolve thousands separators: `"1,234.56"` and `"1,234,567"` are US
/// style, `"2.425.216"` is European (dots as thousands).
fn normalize_separators(token: &str) -> String {
    let dot_count = token.matches('.').count();
    let comma_count = token.matches(',').count();

    if dot_count > 1 {
        token.replace('.', "").replace(',', "")
    } else if comma_count > 0 {
        token.replace(',', "")
    } else {
        token.to_string()
    }
}

/// Number of digits after the decimal point in a raw percent/amount string.
pub fn decimal_places(value_str: &str) -> usize {
    let cleaned = value_str.trim().replace('%', "").replace(',', "");
    match cleaned.split_once('.') {
        Some((_, frac)) => frac.len(),
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
