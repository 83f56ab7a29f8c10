//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Width of an externally visible account number, in decimal digits.
pub const ACCOUNT_NUMBER_DIGITS: usize = 10;

/// Externally visible account identifier: exactly ten decimal digits.
///
/// Distinct from the internal storage row id, which never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generate a fresh random account number.
    ///
    /// Entropy comes from a v4 UUID reduced to ten digits; uniqueness is
    /// enforced by the store's unique index, with the caller retrying the
    /// (astronomically unlikely) collision.
    pub fn generate() -> Self {
        let n = Uuid::new_v4().as_u128() % 10u128.pow(ACCOUNT_NUMBER_DIGITS as u32);
        Self(format!("{n:010}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ACCOUNT_NUMBER_DIGITS && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(LedgerError::validation(format!(
                "account number must be {ACCOUNT_NUMBER_DIGITS} digits, got {s:?}"
            )))
        }
    }
}

/// Identifier of a committed transaction (storage-assigned, globally
/// monotonic).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Client-supplied token scoping a mutating request so retries with the same
/// token do not re-apply the effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdempotencyKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
