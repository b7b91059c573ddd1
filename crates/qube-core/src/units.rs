//! Conversion between human token amounts and 18-decimal minimal units.
//!
//! Minimal amounts travel as base-10 integer strings. Parsing goes through
//! `u128` and exact decimal arithmetic, so there is no 2^53 precision ceiling:
//! `u128` holds about 3.4e20 whole tokens at 18 decimals.

/// Number of fractional digits of the staking token.
pub const DECIMALS: u32 = 18;

/// Digits shown by [`format_amount`].
pub const DISPLAY_DECIMALS: u32 = 6;

const SCALE: u128 = 10u128.pow(DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Amount out of range: '{0}'")]
    Overflow(String),
}

/// Parse a minimal-unit decimal string. Only plain ASCII digits are accepted.
pub fn parse_minimal(minimal: &str) -> Option<u128> {
    let s = minimal.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u128>().ok()
}

/// Convert a human amount (e.g. `"1.5"`) to minimal units.
///
/// Digits past the 18th fractional place are rounded half-up.
pub fn to_minimal_units(human: &str) -> Result<u128, UnitError> {
    let s = human.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

    let is_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return Err(UnitError::InvalidAmount(human.to_string()));
    }

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| UnitError::Overflow(human.to_string()))?
    };

    let mut kept: String = frac_part.chars().take(DECIMALS as usize).collect();
    while kept.len() < DECIMALS as usize {
        kept.push('0');
    }
    // 18 digits always fit in u128
    let frac: u128 = kept
        .parse()
        .map_err(|_| UnitError::InvalidAmount(human.to_string()))?;
    let round_up = frac_part
        .as_bytes()
        .get(DECIMALS as usize)
        .is_some_and(|d| *d >= b'5');

    whole
        .checked_mul(SCALE)
        .and_then(|v| v.checked_add(frac))
        .and_then(|v| v.checked_add(u128::from(round_up)))
        .ok_or_else(|| UnitError::Overflow(human.to_string()))
}

/// Convert a human amount to a minimal-unit decimal string.
pub fn to_minimal(human: &str) -> Result<String, UnitError> {
    to_minimal_units(human).map(|v| v.to_string())
}

/// Float entry point for callers that only hold an `f64`.
///
/// The float is rendered with its shortest round-trip decimal form first, so
/// `0.1` becomes exactly `100000000000000000`.
pub fn to_minimal_f64(human: f64) -> Result<String, UnitError> {
    if !human.is_finite() || human < 0.0 {
        return Err(UnitError::InvalidAmount(human.to_string()));
    }
    to_minimal(&human.to_string())
}

/// Minimal units to whole tokens, for display only.
///
/// Returns `NaN` for malformed input instead of failing.
pub fn to_human(minimal: &str) -> f64 {
    match parse_minimal(minimal) {
        Some(v) => units_to_human(v),
        None => f64::NAN,
    }
}

/// Same as [`to_human`] for an already parsed value.
pub fn units_to_human(minimal: u128) -> f64 {
    let whole = minimal / SCALE;
    let frac = minimal % SCALE;
    whole as f64 + frac as f64 / SCALE as f64
}

/// Render minimal units as tokens with exactly six fractional digits.
///
/// Malformed input renders as zero.
pub fn format_amount(minimal: &str) -> String {
    format_units(parse_minimal(minimal).unwrap_or(0))
}

/// Same as [`format_amount`] for an already parsed value.
pub fn format_units(minimal: u128) -> String {
    let step = 10u128.pow(DECIMALS - DISPLAY_DECIMALS);
    let scaled = minimal
        .checked_add(step / 2)
        .map(|v| v / step)
        .unwrap_or(minimal / step);
    let display_scale = 10u128.pow(DISPLAY_DECIMALS);
    format!(
        "{}.{:06}",
        scaled / display_scale,
        scaled % display_scale
    )
}
