use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Currency;
use crate::ledger::LedgerError;

/// Non-negative fixed-point amount tagged with its currency and network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
    pub network: String,
}

impl Money {
    /// Largest accepted amount, 10^18 major units. Keeps every split and
    /// running total well inside `Decimal`'s 96-bit mantissa.
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

    /// Build a validated amount. Rejects negatives, anything above
    /// [`Money::MAX_AMOUNT`] and anything finer than the currency's minor unit.
    pub fn new(
        amount: Decimal,
        currency: Currency,
        network: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "amount {amount} is negative"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(LedgerError::InvalidAmount(format!(
                "amount {amount} exceeds the maximum of {}",
                Self::MAX_AMOUNT
            )));
        }
        if amount.normalize().scale() > currency.minor_units() {
            return Err(LedgerError::InvalidAmount(format!(
                "amount {amount} has more than {} decimal places for {currency}",
                currency.minor_units()
            )));
        }

        let mut amount = amount;
        amount.rescale(currency.minor_units());
        Ok(Self {
            amount,
            currency,
            network: network.into(),
        })
    }

    /// Re-check the invariants of a value that arrived through deserialisation.
    pub fn validated(self) -> Result<Self, LedgerError> {
        Money::new(self.amount, self.currency, self.network)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Same-currency addition; the result keeps `self`'s network.
    pub fn checked_add(&self, other: &Money) -> Result<Money, LedgerError> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("{} + {} overflows", self.amount, other.amount))
        })?;
        Ok(Money {
            amount,
            currency: self.currency,
            network: self.network.clone(),
        })
    }

    /// Same-currency subtraction; never goes below zero.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, LedgerError> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        if other.amount > self.amount {
            return Err(LedgerError::InvalidAmount(format!(
                "{} - {} would be negative",
                self.amount, other.amount
            )));
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
            network: self.network.clone(),
        })
    }

    pub fn with_amount(&self, amount: Decimal) -> Money {
        Money {
            amount,
            currency: self.currency,
            network: self.network.clone(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.*} {} ({})",
            self.currency.minor_units() as usize,
            self.amount,
            self.currency,
            self.network
        )
    }
}
