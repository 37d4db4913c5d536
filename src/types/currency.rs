//! Currency codes supported by the engine

use super::error::PaymentError;
use std::fmt;
use std::str::FromStr;

/// Supported currency
///
/// The set is closed: any other ISO code is rejected with
/// [`PaymentError::UnsupportedCurrency`] when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Usd,
    Eur,
    Syp,
}

impl Currency {
    /// Every supported currency, in declaration order
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Syp];

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Syp => "SYP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "SYP" => Ok(Currency::Syp),
            _ => Err(PaymentError::unsupported_currency(s.trim())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", Currency::Usd)]
    #[case("eur", Currency::Eur)]
    #[case(" SYP ", Currency::Syp)]
    fn test_parse_supported(#[case] code: &str, #[case] expected: Currency) {
        assert_eq!(code.parse::<Currency>().unwrap(), expected);
    }

    #[rstest]
    #[case("GBP")]
    #[case("")]
    #[case("US")]
    fn test_parse_unsupported(#[case] code: &str) {
        let err = code.parse::<Currency>().unwrap_err();
        assert!(matches!(err, PaymentError::UnsupportedCurrency { .. }));
    }

    #[test]
    fn test_display_matches_code() {
        for currency in Currency::ALL {
            assert_eq!(currency.to_string(), currency.code());
        }
    }
}
