use std::collections::HashMap;

use chrono::NaiveDate;
use moneta_core::{CurrencyCode, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when a rate cannot be produced for a currency pair.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("no exchange rate for {base}/{quote} on {date}")]
    Unavailable {
        base: CurrencyCode,
        quote: CurrencyCode,
        date: NaiveDate,
    },
}

/// Contract of the exchange-rate subsystem as the ledger consumes it:
/// one rate per `(user, date, base, quote)`. Fetching, caching, and
/// fallback policies live behind this seam.
pub trait RateResolver: Send + Sync {
    fn rate(
        &self,
        user: UserId,
        date: NaiveDate,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Decimal, RateError>;
}

/// Table-driven resolver. Same-code pairs always resolve to 1, so
/// single-currency deployments can use an empty table.
#[derive(Debug, Default)]
pub struct FixedRateResolver {
    table: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FixedRateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(
        mut self,
        base: impl Into<CurrencyCode>,
        quote: impl Into<CurrencyCode>,
        rate: Decimal,
    ) -> Self {
        self.table.insert((base.into(), quote.into()), rate);
        self
    }
}

impl RateResolver for FixedRateResolver {
    fn rate(
        &self,
        _user: UserId,
        date: NaiveDate,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Decimal, RateError> {
        if base == quote {
            return Ok(Decimal::ONE);
        }
        self.table
            .get(&(base.clone(), quote.clone()))
            .copied()
            .ok_or_else(|| RateError::Unavailable {
                base: base.clone(),
                quote: quote.clone(),
                date,
            })
    }
}
