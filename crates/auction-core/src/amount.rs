//! Fixed-point amount handling over the chain's smallest unit.
//!
//! All on-chain values are carried as `u128` smallest units; user-entered
//! decimal strings are converted exactly once at the action boundary with
//! checked arithmetic. The decimal exponent comes from configuration.

/// Why a user-entered amount was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a plain decimal number")]
    Malformed,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount has more than {max} decimal places")]
    TooManyDecimals { max: u32 },
    #[error("amount is too large")]
    Overflow,
}

/// Parse a decimal string into smallest units (`"1.5"` with 18 decimals is
/// `1_500_000_000_000_000_000`). Rejects empty, signed, malformed,
/// over-precise, zero and overflowing inputs.
pub fn parse_amount(text: &str, decimals: u32) -> Result<u128, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Malformed);
    }
    // "1." is rejected; ".5" is accepted as 0.5.
    if frac_part.is_empty() && text.contains('.') {
        return Err(AmountError::Malformed);
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Malformed);
    }
    let frac_len = u32::try_from(frac_part.len()).map_err(|_| AmountError::Malformed)?;
    if frac_len > decimals {
        return Err(AmountError::TooManyDecimals { max: decimals });
    }

    let scale = pow10(decimals).ok_or(AmountError::Overflow)?;
    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| AmountError::Overflow)?
    };
    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let parsed: u128 = frac_part.parse().map_err(|_| AmountError::Overflow)?;
        let pad = pow10(decimals - frac_len).ok_or(AmountError::Overflow)?;
        parsed.checked_mul(pad).ok_or(AmountError::Overflow)?
    };

    let units = int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(AmountError::Overflow)?;
    if units == 0 {
        return Err(AmountError::NotPositive);
    }
    Ok(units)
}

/// Render smallest units as a canonical decimal string: no trailing zeros in
/// the fraction, `"0"` for zero.
pub fn format_amount(units: u128, decimals: u32) -> String {
    let Some(scale) = pow10(decimals) else {
        return units.to_string();
    };
    let int_part = units / scale;
    let frac_part = units % scale;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let width = usize::try_from(decimals).unwrap_or(0);
    let frac = format!("{frac_part:0width$}");
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}

fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}
