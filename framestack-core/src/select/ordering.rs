use std::cmp::Ordering;

use crate::foundation::core::InputFile;

/// Sort key formed by the decimal digits of a filename.
///
/// All non-digit characters are dropped and the remaining digits read as one
/// non-negative integer; no digits means 0. Keys compare as arbitrary
/// precision integers, so long digit runs never overflow.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderingKey {
    // ASCII digits, no leading zeros; empty for zero.
    digits: String,
}

impl OrderingKey {
    /// Extract the key from a filename (not a full path).
    pub fn from_file_name(name: &str) -> Self {
        let digits: String = name
            .chars()
            .filter(char::is_ascii_digit)
            .skip_while(|c| *c == '0')
            .collect();
        Self { digits }
    }

    /// Key as a `u128`, saturating at `u128::MAX` for absurdly long runs.
    pub fn value(&self) -> u128 {
        if self.digits.is_empty() {
            return 0;
        }
        self.digits.parse().unwrap_or(u128::MAX)
    }

    /// Decimal rendering without leading zeros.
    pub fn as_decimal(&self) -> &str {
        if self.digits.is_empty() {
            "0"
        } else {
            &self.digits
        }
    }
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_decimal())
    }
}

/// Stable ascending sort by [`OrderingKey`]. Equal keys keep input order.
pub fn order_inputs(mut files: Vec<InputFile>) -> Vec<InputFile> {
    files.sort_by_cached_key(|f| OrderingKey::from_file_name(&f.file_name()));
    files
}

#[cfg(test)]
#[path = "../../tests/unit/select/ordering.rs"]
mod tests;
