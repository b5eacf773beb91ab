use crate::sync_actor::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// The diner's choice on the tip step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipChoice {
    /// A percentage of the subtotal.
    Percentage(u32),
    /// A free-entered absolute amount.
    Custom(Decimal),
    Skip,
}

impl TipChoice {
    /// Reads a free-entered amount. Blank or unreadable input counts as no tip.
    pub fn parse_custom(input: &str) -> Result<Self, ValidationError> {
        let amount = Decimal::from_str(input.trim()).unwrap_or(Decimal::ZERO);
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::NegativeTip);
        }
        Ok(TipChoice::Custom(amount))
    }

    pub fn amount(&self, subtotal: Decimal) -> Result<Decimal, ValidationError> {
        let amount = match *self {
            TipChoice::Percentage(percent) => subtotal * Decimal::from(percent) / Decimal::ONE_HUNDRED,
            TipChoice::Custom(amount) if amount.is_sign_negative() && !amount.is_zero() => {
                return Err(ValidationError::NegativeTip)
            }
            TipChoice::Custom(amount) => amount,
            TipChoice::Skip => Decimal::ZERO,
        };
        Ok(round_money(amount))
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One preset button on the tip step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipOption {
    pub percent: u32,
    pub amount: Decimal,
}

pub fn tip_options(subtotal: Decimal, presets: &[u32]) -> Vec<TipOption> {
    presets
        .iter()
        .map(|&percent| TipOption {
            percent,
            amount: round_money(subtotal * Decimal::from(percent) / Decimal::ONE_HUNDRED),
        })
        .collect()
}
