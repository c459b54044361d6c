//! Value objects for the product domain.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::DomainError;

/// Non-negative monetary amount with two fractional digits.
///
/// Amounts are rounded half away from zero on construction, so
/// `19.995` becomes `20.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// Number of fractional digits kept.
    pub const SCALE: u32 = 2;

    /// Creates a money amount, rejecting negative input.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::NegativeMoney { amount });
        }

        let mut rounded =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::SCALE);
        Ok(Self { amount: rounded })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self {
            amount: Decimal::new(0, Self::SCALE),
        }
    }

    /// Returns the amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Adds another money amount.
    pub fn add(&self, other: Money) -> Result<Money, DomainError> {
        Money::new(self.amount + other.amount)
    }

    /// Subtracts another money amount, failing if the result would be negative.
    pub fn subtract(&self, other: Money) -> Result<Money, DomainError> {
        let result = self.amount - other.amount;
        if result.is_sign_negative() && !result.is_zero() {
            return Err(DomainError::NegativeMoneyResult);
        }
        Money::new(result)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.amount)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Money::new(amount)
    }
}

/// Stock keeping unit in normalized form.
///
/// Normalization trims and upper-cases the input, strips spaces, hyphens and
/// underscores, and replaces the letter `O` with the digit `0` when the code
/// contains at least one digit. Two SKUs that differ only by case or
/// separators are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sku(String);

impl Sku {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 32;

    /// Parses and normalizes a raw SKU.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::EmptySku);
        }

        let normalized = Self::normalize(raw);
        if !Self::is_valid_normalized(&normalized) {
            return Err(DomainError::InvalidSkuFormat { normalized });
        }

        Ok(Self(normalized))
    }

    /// Normalizes a raw SKU without checking its format.
    pub fn normalize(raw: &str) -> String {
        let stripped: String = raw
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        if stripped.chars().any(|c| c.is_ascii_digit()) {
            stripped.replace('O', "0")
        } else {
            stripped
        }
    }

    fn is_valid_normalized(s: &str) -> bool {
        (Self::MIN_LEN..=Self::MAX_LEN).contains(&s.len())
            && s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    /// Returns the normalized SKU.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Sku {
    type Error = DomainError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Sku::parse(raw)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
