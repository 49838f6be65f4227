//! Currencies, recurring intervals and minor-unit conversion.
//!
//! Stripe expects amounts in the currency's smallest unit. Most currencies
//! have 100 minor units per major unit; a fixed set of "zero-decimal"
//! currencies (JPY, KRW, ...) have none.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Currencies accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
    Nzd,
    Chf,
    Sek,
    Nok,
    Dkk,
    Sgd,
    Hkd,
    Mxn,
    Brl,
    Inr,
    Pln,
    Czk,
    Huf,
    Ils,
    Aed,
    Sar,
    Jpy,
    Krw,
    Vnd,
    Clp,
}

/// ISO codes Stripe treats as having no minor unit.
///
/// Wider than [`Currency`] because amounts reported back by Stripe may use
/// currencies this service never offers at checkout.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "vnd", "vuv", "xaf",
    "xof", "xpf",
];

impl Currency {
    /// All supported currencies.
    pub const ALL: [Currency; 25] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Cad,
        Currency::Aud,
        Currency::Nzd,
        Currency::Chf,
        Currency::Sek,
        Currency::Nok,
        Currency::Dkk,
        Currency::Sgd,
        Currency::Hkd,
        Currency::Mxn,
        Currency::Brl,
        Currency::Inr,
        Currency::Pln,
        Currency::Czk,
        Currency::Huf,
        Currency::Ils,
        Currency::Aed,
        Currency::Sar,
        Currency::Jpy,
        Currency::Krw,
        Currency::Vnd,
        Currency::Clp,
    ];

    /// Lowercase ISO 4217 code, the form the Stripe API uses.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Gbp => "gbp",
            Currency::Cad => "cad",
            Currency::Aud => "aud",
            Currency::Nzd => "nzd",
            Currency::Chf => "chf",
            Currency::Sek => "sek",
            Currency::Nok => "nok",
            Currency::Dkk => "dkk",
            Currency::Sgd => "sgd",
            Currency::Hkd => "hkd",
            Currency::Mxn => "mxn",
            Currency::Brl => "brl",
            Currency::Inr => "inr",
            Currency::Pln => "pln",
            Currency::Czk => "czk",
            Currency::Huf => "huf",
            Currency::Ils => "ils",
            Currency::Aed => "aed",
            Currency::Sar => "sar",
            Currency::Jpy => "jpy",
            Currency::Krw => "krw",
            Currency::Vnd => "vnd",
            Currency::Clp => "clp",
        }
    }

    /// Returns true if the currency has no minor unit.
    pub fn is_zero_decimal(&self) -> bool {
        is_zero_decimal_code(self.code())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or_else(|| ValidationError::unsupported("currency", s))
    }
}

/// Returns true if the ISO code (any case) is a zero-decimal currency.
pub fn is_zero_decimal_code(code: &str) -> bool {
    let code = code.to_ascii_lowercase();
    ZERO_DECIMAL_CURRENCIES.contains(&code.as_str())
}

/// Billing interval for recurring prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringInterval {
    Day,
    Week,
    Month,
    Year,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringInterval::Day => "day",
            RecurringInterval::Week => "week",
            RecurringInterval::Month => "month",
            RecurringInterval::Year => "year",
        }
    }
}

impl FromStr for RecurringInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(RecurringInterval::Day),
            "week" => Ok(RecurringInterval::Week),
            "month" => Ok(RecurringInterval::Month),
            "year" => Ok(RecurringInterval::Year),
            _ => Err(ValidationError::unsupported("recurring_interval", s)),
        }
    }
}

/// Converts a major-unit amount (e.g. `12.34` USD) to minor units (`1234`).
///
/// Zero-decimal currencies are rounded to whole units instead. The result
/// must be a positive amount.
///
/// # Errors
///
/// Returns `ValidationError::InvalidFormat` for non-finite input or a
/// result that is not strictly positive.
pub fn to_minor_unit(amount_major: f64, currency: Currency) -> Result<i64, ValidationError> {
    if !amount_major.is_finite() {
        return Err(ValidationError::invalid_format("amount", "Invalid amount"));
    }

    let scaled = if currency.is_zero_decimal() {
        amount_major.round()
    } else {
        (amount_major * 100.0).round()
    };

    if scaled <= 0.0 || scaled > i64::MAX as f64 {
        return Err(ValidationError::invalid_format("amount", "Invalid amount"));
    }

    Ok(scaled as i64)
}

/// Converts a minor-unit amount reported by Stripe back to major units.
pub fn from_minor_unit(amount_minor: i64, currency_code: &str) -> f64 {
    if is_zero_decimal_code(currency_code) {
        amount_minor as f64
    } else {
        amount_minor as f64 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_currency_case_insensitively() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" jpy ".parse::<Currency>().unwrap(), Currency::Jpy);
    }

    #[test]
    fn rejects_unsupported_currency() {
        let result = "xyz".parse::<Currency>();
        assert!(matches!(result, Err(ValidationError::Unsupported { .. })));
    }

    #[test]
    fn every_currency_round_trips_through_its_code() {
        for currency in Currency::ALL {
            assert_eq!(currency.code().parse::<Currency>().unwrap(), currency);
        }
    }

    #[test]
    fn zero_decimal_currencies_are_flagged() {
        assert!(Currency::Jpy.is_zero_decimal());
        assert!(Currency::Krw.is_zero_decimal());
        assert!(Currency::Vnd.is_zero_decimal());
        assert!(Currency::Clp.is_zero_decimal());
        assert!(!Currency::Usd.is_zero_decimal());
        assert!(is_zero_decimal_code("XOF"));
    }

    #[test]
    fn to_minor_unit_scales_decimal_currencies() {
        assert_eq!(to_minor_unit(12.34, Currency::Usd).unwrap(), 1234);
        assert_eq!(to_minor_unit(0.5, Currency::Eur).unwrap(), 50);
        assert_eq!(to_minor_unit(19.999, Currency::Gbp).unwrap(), 2000);
    }

    #[test]
    fn to_minor_unit_keeps_zero_decimal_amounts_whole() {
        assert_eq!(to_minor_unit(1000.0, Currency::Jpy).unwrap(), 1000);
        assert_eq!(to_minor_unit(1000.4, Currency::Krw).unwrap(), 1000);
    }

    #[test]
    fn to_minor_unit_rejects_non_positive_amounts() {
        assert!(to_minor_unit(0.0, Currency::Usd).is_err());
        assert!(to_minor_unit(-5.0, Currency::Usd).is_err());
        assert!(to_minor_unit(0.004, Currency::Usd).is_err());
        assert!(to_minor_unit(0.4, Currency::Jpy).is_err());
    }

    #[test]
    fn to_minor_unit_rejects_non_finite_amounts() {
        assert!(to_minor_unit(f64::NAN, Currency::Usd).is_err());
        assert!(to_minor_unit(f64::INFINITY, Currency::Usd).is_err());
    }

    #[test]
    fn from_minor_unit_reverses_scaling() {
        assert_eq!(from_minor_unit(1234, "usd"), 12.34);
        assert_eq!(from_minor_unit(1000, "JPY"), 1000.0);
    }

    #[test]
    fn parses_recurring_interval() {
        assert_eq!("Month".parse::<RecurringInterval>().unwrap(), RecurringInterval::Month);
        assert_eq!(RecurringInterval::Year.as_str(), "year");
        assert!("fortnight".parse::<RecurringInterval>().is_err());
    }
}
