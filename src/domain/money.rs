use thiserror::Error;

/// Balances and amounts are integer minor units (cents), so 125.50 EUR is 12550.
/// Negative values are only meaningful for balances and overdraft limits.
pub type Cents = i64;

/// Render cents as a two-decimal string: 12550 -> "125.50", -5 -> "-0.05".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format: {0:?}")]
    InvalidFormat(String),

    #[error("amounts support at most two decimal places: {0:?}")]
    TooPrecise(String),

    #[error("amount out of range: {0:?}")]
    Overflow(String),
}

/// Parse a decimal string into cents.
///
/// Accepts "50", "50.5", "50.05", ".75" and a leading '-'. Unlike a display
/// formatter this refuses to silently drop precision, since the value is
/// about to move money.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let raw = input.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let invalid = || ParseCentsError::InvalidFormat(input.to_string());
    let (units_str, frac_str) = match digits.split_once('.') {
        Some((units, frac)) => (units, frac),
        None => (digits, ""),
    };

    if units_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if frac_str.len() > 2 {
        return Err(ParseCentsError::TooPrecise(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::Overflow(input.to_string()))?
    };
    let frac: i64 = match frac_str.len() {
        0 => 0,
        1 => frac_str.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac_str.parse().map_err(|_| invalid())?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(|| ParseCentsError::Overflow(input.to_string()))?;

    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(12550), "125.50");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-20000), "-200.00");
        assert_eq!(format_cents(-5), "-0.05");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("250"), Ok(25000));
        assert_eq!(parse_cents("250.00"), Ok(25000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(".75"), Ok(75));
        assert_eq!(parse_cents(" 3. "), Ok(300));
        assert_eq!(parse_cents("-200"), Ok(-20000));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert!(matches!(parse_cents("abc"), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("1.2.3"), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents(""), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("."), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("+5"), Err(ParseCentsError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_cents_rejects_sub_cent_precision() {
        assert!(matches!(parse_cents("10.999"), Err(ParseCentsError::TooPrecise(_))));
    }

    #[test]
    fn test_parse_cents_overflow() {
        assert!(matches!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::Overflow(_))
        ));
    }
}
