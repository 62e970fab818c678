use std::fmt;

/// Fuel quantities are tracked in liters as floating point.
pub type Liters = f64;

/// Absolute tolerance for every "effectively zero" or "effectively less or equal"
/// comparison on liters. Ride, fill and pay paths all go through this constant.
pub const LITER_EPSILON: Liters = 1e-9;

/// True when a liter amount is zero within [`LITER_EPSILON`].
pub fn is_effectively_zero(liters: Liters) -> bool {
    liters.abs() <= LITER_EPSILON
}

/// Format liters with two decimals, e.g. `12.5` -> "12.50".
pub fn format_liters(liters: Liters) -> String {
    format!("{:.2}", liters)
}

/// Format a cash amount with the given currency symbol, e.g. `("₹", 100.0)` -> "₹100.00".
pub fn format_cash(symbol: &str, amount: f64) -> String {
    format!("{}{:.2}", symbol, amount)
}

/// How a debtor wants to pay down their debt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayRequest {
    /// Clear the whole outstanding debt.
    Full,
    /// Clear as many liters as the cash amount buys at the last known price.
    Cash(f64),
}

impl PayRequest {
    /// Parse the `full` keyword (any case) or a decimal cash amount.
    /// Positivity is checked by the engine, not here.
    pub fn parse(input: &str) -> Result<Self, ParsePayError> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("full") {
            return Ok(PayRequest::Full);
        }
        let amount: f64 = input.parse().map_err(|_| ParsePayError::InvalidFormat)?;
        if !amount.is_finite() {
            return Err(ParsePayError::InvalidFormat);
        }
        Ok(PayRequest::Cash(amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePayError {
    InvalidFormat,
}

impl fmt::Display for ParsePayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePayError::InvalidFormat => write!(f, "expected 'full' or a cash amount"),
        }
    }
}

impl std::error::Error for ParsePayError {}
