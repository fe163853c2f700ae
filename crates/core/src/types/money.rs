//! Algerian dinar amounts using decimal arithmetic.

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::i18n::{Language, translate};

/// Non-breaking space used between digit groups and before the currency.
const NBSP: char = '\u{a0}';

/// An amount in Algerian dinars (DA / دج).
///
/// Prices are entered by admins as plain numbers, so the amount is kept as a
/// `Decimal` with whatever scale was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dinars(Decimal);

impl Dinars {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// A whole number of dinars.
    #[must_use]
    pub fn from_whole(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// `None` when the sum does not fit a `Decimal`.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Line price for `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Tax on this amount at `rate`, rounded to whole dinars.
    ///
    /// Midpoints round away from zero, so `0.5` becomes `1`.
    #[must_use]
    pub fn tax(self, rate: Decimal) -> Self {
        Self((self.0 * rate).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// The number with digit grouping and no currency, e.g. `1 500`.
    #[must_use]
    pub fn format_amount(&self) -> String {
        let normalized = self.0.normalize();
        let text = normalized.abs().to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(NBSP);
            }
            grouped.push(ch);
        }

        let sign = if self.is_negative() { "-" } else { "" };
        if fraction.is_empty() {
            format!("{sign}{grouped}")
        } else {
            format!("{sign}{grouped}.{fraction}")
        }
    }

    /// The amount followed by the localized currency, e.g. `1 500 DA`.
    #[must_use]
    pub fn display(&self, lang: Language) -> String {
        format!("{}{NBSP}{}", self.format_amount(), translate("da", lang))
    }
}

impl Add for Dinars {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Dinars {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Dinars {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl core::fmt::Display for Dinars {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(Dinars::from_whole(0).format_amount(), "0");
        assert_eq!(Dinars::from_whole(999).format_amount(), "999");
        assert_eq!(Dinars::from_whole(1500).format_amount(), "1\u{a0}500");
        assert_eq!(
            Dinars::from_whole(1_234_567).format_amount(),
            "1\u{a0}234\u{a0}567"
        );
        assert_eq!(
            Dinars::new(Decimal::new(250_050, 2)).format_amount(),
            "2\u{a0}500.5"
        );
        assert_eq!(Dinars::from_whole(-4500).format_amount(), "-4\u{a0}500");
    }

    #[test]
    fn test_display_uses_localized_currency() {
        let price = Dinars::from_whole(3200);
        assert_eq!(price.display(Language::Fr), "3\u{a0}200\u{a0}DA");
        assert_eq!(price.display(Language::Ar), "3\u{a0}200\u{a0}دج");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Dinars = [
            Dinars::from_whole(1200).times(2),
            Dinars::from_whole(350).times(3),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, Dinars::from_whole(3450));
    }

    #[test]
    fn test_tax_rounds_midpoint_away_from_zero() {
        let rate = Decimal::new(19, 2);
        // 150 * 0.19 = 28.5
        assert_eq!(Dinars::from_whole(150).tax(rate), Dinars::from_whole(29));
        // 1000 * 0.19 = 190
        assert_eq!(Dinars::from_whole(1000).tax(rate), Dinars::from_whole(190));
        // 10 * 0.19 = 1.9
        assert_eq!(Dinars::from_whole(10).tax(rate), Dinars::from_whole(2));
    }
}
