//! Human-shareable order numbers.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum OrderNumberError {
    /// The input does not start with the `ORD` prefix.
    #[error("order number must start with {prefix}", prefix = OrderNumber::PREFIX)]
    MissingPrefix,
    /// The input has the wrong length.
    #[error("order number must be exactly {len} characters", len = OrderNumber::LENGTH)]
    WrongLength,
    /// The suffix contains a non-digit character.
    #[error("order number suffix must be numeric")]
    NonNumericSuffix,
}

/// A globally unique, human-shareable order identifier.
///
/// Format: the fixed prefix `ORD` followed by 10 random decimal digits,
/// e.g. `ORD4821937465`. With 10^10 possible suffixes the collision
/// probability is negligible; the order store additionally enforces a
/// unique index and the checkout orchestrator regenerates once on a
/// collision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Fixed prefix of every order number.
    pub const PREFIX: &'static str = "ORD";

    /// Number of random decimal digits after the prefix.
    pub const SUFFIX_LEN: usize = 10;

    /// Total length of an order number.
    pub const LENGTH: usize = Self::PREFIX.len() + Self::SUFFIX_LEN;

    /// Generate a fresh order number from the thread-local RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a fresh order number from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut s = String::with_capacity(Self::LENGTH);
        s.push_str(Self::PREFIX);
        for _ in 0..Self::SUFFIX_LEN {
            let digit: u8 = rng.random_range(0..10);
            s.push(char::from(b'0' + digit));
        }
        Self(s)
    }

    /// Parse an `OrderNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not have the `ORD` prefix, the
    /// exact expected length, or a fully numeric suffix.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let suffix = s
            .strip_prefix(Self::PREFIX)
            .ok_or(OrderNumberError::MissingPrefix)?;

        if suffix.len() != Self::SUFFIX_LEN {
            return Err(OrderNumberError::WrongLength);
        }

        if !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NonNumericSuffix);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        for _ in 0..100 {
            let number = OrderNumber::generate();
            let s = number.as_str();
            assert_eq!(s.len(), OrderNumber::LENGTH);
            assert!(s.starts_with(OrderNumber::PREFIX));
            assert!(s[OrderNumber::PREFIX.len()..].bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generated_parses_back() {
        let number = OrderNumber::generate();
        let parsed = OrderNumber::parse(number.as_str()).unwrap();
        assert_eq!(parsed, number);
    }

    #[test]
    fn test_parse_valid() {
        let number = OrderNumber::parse("ORD0123456789").unwrap();
        assert_eq!(number.as_str(), "ORD0123456789");
    }

    #[test]
    fn test_parse_missing_prefix() {
        assert!(matches!(
            OrderNumber::parse("XYZ0123456789"),
            Err(OrderNumberError::MissingPrefix)
        ));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            OrderNumber::parse("ORD123"),
            Err(OrderNumberError::WrongLength)
        ));
        assert!(matches!(
            OrderNumber::parse("ORD01234567890"),
            Err(OrderNumberError::WrongLength)
        ));
    }

    #[test]
    fn test_parse_non_numeric_suffix() {
        assert!(matches!(
            OrderNumber::parse("ORD12345678ab"),
            Err(OrderNumberError::NonNumericSuffix)
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let number = OrderNumber::parse("ORD0123456789").unwrap();
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"ORD0123456789\"");
    }
}
