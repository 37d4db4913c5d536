//! Currency conversion
//!
//! Conversion is a pure function of a rate table: an amount moves from one
//! currency to another through the common base unit,
//! `amount * rate(to) / rate(from)`. Converted amounts are rounded half-up to
//! two fractional digits, quoted rates to six.

use crate::core::traits::RateProvider;
use crate::types::money::{round_amount, round_rate};
use crate::types::{Currency, PaymentError};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Fixed rate table, units of each currency per US dollar
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRates;

impl RateProvider for StaticRates {
    fn units_per_base(&self, currency: Currency) -> Option<Decimal> {
        let rate = match currency {
            Currency::Usd => Decimal::ONE,
            Currency::Eur => Decimal::new(93, 2),
            Currency::Syp => Decimal::new(2500, 0),
        };
        Some(rate)
    }
}

/// Converts amounts between currencies using a [`RateProvider`]
#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<dyn RateProvider>,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn RateProvider>) -> Self {
        Self { rates }
    }

    /// Converter over the built-in [`StaticRates`] table
    pub fn with_static_rates() -> Self {
        Self::new(Arc::new(StaticRates))
    }

    fn units(&self, currency: Currency) -> Result<Decimal, PaymentError> {
        self.rates
            .units_per_base(currency)
            .filter(|rate| *rate > Decimal::ZERO)
            .ok_or_else(|| PaymentError::unsupported_currency(currency.code()))
    }

    /// Unrounded `rate(to) / rate(from)`
    fn ratio(&self, from: Currency, to: Currency) -> Result<Decimal, PaymentError> {
        let from_units = self.units(from)?;
        let to_units = self.units(to)?;
        if from == to {
            return Ok(Decimal::ONE);
        }
        to_units
            .checked_div(from_units)
            .ok_or_else(|| PaymentError::arithmetic_overflow("rate"))
    }

    /// Convert `amount` from `from` into `to`
    ///
    /// Same-currency conversion returns `amount` untouched.
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal, PaymentError> {
        let ratio = self.ratio(from, to)?;
        if from == to {
            return Ok(amount);
        }
        let converted = amount
            .checked_mul(ratio)
            .ok_or_else(|| PaymentError::arithmetic_overflow("convert"))?;
        Ok(round_amount(converted))
    }

    /// Quoted exchange rate from `from` to `to`, six fractional digits
    pub fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, PaymentError> {
        Ok(round_rate(self.ratio(from, to)?))
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::with_static_rates()
    }
}

impl std::fmt::Debug for CurrencyConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyConverter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    /// Prices only US dollars
    struct DollarOnly;

    impl RateProvider for DollarOnly {
        fn units_per_base(&self, currency: Currency) -> Option<Decimal> {
            (currency == Currency::Usd).then_some(Decimal::ONE)
        }
    }

    #[rstest]
    #[case(Currency::Usd, Currency::Eur, "0.930000")]
    #[case(Currency::Eur, Currency::Usd, "1.075269")]
    #[case(Currency::Usd, Currency::Syp, "2500.000000")]
    #[case(Currency::Syp, Currency::Usd, "0.000400")]
    #[case(Currency::Eur, Currency::Eur, "1.000000")]
    fn test_rate_quotes(#[case] from: Currency, #[case] to: Currency, #[case] expected: &str) {
        let converter = CurrencyConverter::default();
        assert_eq!(converter.rate(from, to).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case(dec!(40.00), Currency::Usd, Currency::Eur, dec!(37.20))]
    #[case(dec!(50.00), Currency::Eur, Currency::Usd, dec!(53.76))]
    #[case(dec!(1.00), Currency::Eur, Currency::Syp, dec!(2688.17))]
    fn test_convert(
        #[case] amount: Decimal,
        #[case] from: Currency,
        #[case] to: Currency,
        #[case] expected: Decimal,
    ) {
        let converter = CurrencyConverter::default();
        assert_eq!(converter.convert(amount, from, to).unwrap(), expected);
    }

    #[test]
    fn test_identity_conversion_is_exact() {
        let converter = CurrencyConverter::default();
        for currency in Currency::ALL {
            for amount in [dec!(0.01), dec!(37.20), dec!(123456.78)] {
                assert_eq!(converter.convert(amount, currency, currency).unwrap(), amount);
            }
        }
    }

    #[test]
    fn test_round_trip_within_rounding_tolerance() {
        let converter = CurrencyConverter::default();
        for from in Currency::ALL {
            for to in Currency::ALL {
                for amount in [dec!(0.01), dec!(1.00), dec!(12.34), dec!(999.99), dec!(250000.00)] {
                    let there = converter.convert(amount, from, to).unwrap();
                    let back = converter.convert(there, to, from).unwrap();
                    // One rounding step in `to` is worth rate(to -> from) units of `from`,
                    // plus one more step when rounding back.
                    let tolerance = dec!(0.01) * converter.rate(to, from).unwrap() + dec!(0.01);
                    assert!(
                        (back - amount).abs() <= tolerance,
                        "{} {} -> {} {} -> {} {} exceeds {}",
                        amount, from, there, to, back, from, tolerance
                    );
                }
            }
        }
    }

    #[test]
    fn test_unpriced_currency_is_unsupported() {
        let converter = CurrencyConverter::new(Arc::new(DollarOnly));
        let err = converter
            .convert(dec!(1.00), Currency::Usd, Currency::Eur)
            .unwrap_err();
        assert_eq!(err, PaymentError::unsupported_currency("EUR"));

        let err = converter.rate(Currency::Syp, Currency::Usd).unwrap_err();
        assert_eq!(err, PaymentError::unsupported_currency("SYP"));
    }
}
