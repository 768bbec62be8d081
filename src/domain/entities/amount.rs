use serde::{Deserialize, Serialize};

/// Tiyin per sum.
pub const MINOR_UNITS_PER_SUM: i64 = 100;

/// Monetary amount in tiyin (1/100 UZS sum).
///
/// Amounts are integral minor units end to end; gateways that want major
/// units get them through [`Amount::to_sum_string`] or [`Amount::to_sum_number`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_tiyin(tiyin: i64) -> Self {
        Amount(tiyin)
    }

    pub fn from_sum(sum: i64) -> Self {
        Amount(sum * MINOR_UNITS_PER_SUM)
    }

    pub fn tiyin(&self) -> i64 {
        self.0
    }

    /// Major units with exactly two decimals, e.g. `99000.00`.
    pub fn to_sum_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_UNITS_PER_SUM as u64;
        format!("{}{}.{:02}", sign, abs / per, abs % per)
    }

    /// Major units with no trailing zeros, the way a JSON number prints:
    /// `99000`, `99000.5`, `0.05`.
    pub fn to_sum_plain(&self) -> String {
        let fixed = self.to_sum_string();
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }

    /// Major units as a JSON number. Whole sums stay integers.
    pub fn to_sum_number(&self) -> serde_json::Number {
        if self.0 % MINOR_UNITS_PER_SUM == 0 {
            return serde_json::Number::from(self.0 / MINOR_UNITS_PER_SUM);
        }
        // Finite for every i64, so this never falls back.
        serde_json::Number::from_f64(self.0 as f64 / MINOR_UNITS_PER_SUM as f64)
            .unwrap_or_else(|| serde_json::Number::from(self.0 / MINOR_UNITS_PER_SUM))
    }

    /// Parse a major-unit decimal string (`99000`, `99000.5`, `99000.00`).
    ///
    /// Returns `None` for anything with more than two fractional digits or
    /// non-digit characters.
    pub fn parse_sum(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        let tiyin = whole.checked_mul(MINOR_UNITS_PER_SUM)?.checked_add(frac)?;
        Some(Amount(if negative { -tiyin } else { tiyin }))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} UZS", self.to_sum_string())
    }
}
