//! # Identifier Generation and Clock
//!
//! Injected capabilities for everything in the core that is not a pure
//! function of its inputs: the wall clock and random identifiers.
//!
//! ## Formats
//! ```text
//! Transaction number:  TXN 20260115093042 0718
//!                      ─┬─ ──────┬─────── ─┬──
//!                       │        │         └── 4 random digits
//!                       │        └──────────── UTC timestamp YYYYMMDDHHMMSS
//!                       └───────────────────── fixed prefix
//!
//! Barcode:             K7Q2M9X0AB   (10 chars, uniform over A-Z 0-9)
//! ```
//!
//! Neither format is collision-free. Persistence treats a uniqueness
//! violation as retryable: regenerate and try again.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{BARCODE_LENGTH, TRANSACTION_NUMBER_PREFIX};

const BARCODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// =============================================================================
// Clock
// =============================================================================

/// Source of timestamps.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Identifier Generator
// =============================================================================

/// Produces human-facing identifiers.
///
/// Implementations must be usable from several threads at once; tests
/// substitute deterministic sequences.
pub trait IdGenerator: Send + Sync {
    /// `"TXN" + now as YYYYMMDDHHMMSS + 4 random digits`.
    fn transaction_number(&self, now: DateTime<Utc>) -> String;

    /// 10 characters from `A-Z0-9`.
    fn barcode(&self) -> String;
}

/// Generator backed by `rand::thread_rng`, a CSPRNG seeded from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureIdGenerator;

impl IdGenerator for SecureIdGenerator {
    fn transaction_number(&self, now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        format_transaction_number(now, suffix)
    }

    fn barcode(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..BARCODE_LENGTH)
            .map(|_| BARCODE_ALPHABET[rng.gen_range(0..BARCODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Formats a transaction number from its timestamp and 4-digit suffix.
pub fn format_transaction_number(now: DateTime<Utc>, suffix: u16) -> String {
    format!(
        "{}{}{:04}",
        TRANSACTION_NUMBER_PREFIX,
        now.format("%Y%m%d%H%M%S"),
        suffix % 10_000
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU16, Ordering};

    /// Clock frozen at a fixed instant.
    #[derive(Debug)]
    pub(crate) struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Deterministic generator: suffixes 0001, 0002, ... and barcodes SEQ0000001, ...
    #[derive(Default)]
    pub(crate) struct SequenceIds(AtomicU16);

    impl IdGenerator for SequenceIds {
        fn transaction_number(&self, now: DateTime<Utc>) -> String {
            format_transaction_number(now, self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn barcode(&self) -> String {
            format!("SEQ{:07}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    pub(crate) fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 42).unwrap()
    }

    #[test]
    fn test_transaction_number_format() {
        let number = SecureIdGenerator.transaction_number(fixed_instant());
        assert_eq!(number.len(), 3 + 14 + 4);
        assert!(number.starts_with("TXN20260115093042"));
        assert!(number[17..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_suffix_is_zero_padded() {
        assert_eq!(
            format_transaction_number(fixed_instant(), 7),
            "TXN202601150930420007"
        );
    }

    #[test]
    fn test_barcode_alphabet() {
        for _ in 0..100 {
            let barcode = SecureIdGenerator.barcode();
            assert_eq!(barcode.len(), BARCODE_LENGTH);
            assert!(barcode
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(crate::validation::validate_barcode(&barcode).is_ok());
        }
    }

    #[test]
    fn test_sequence_is_deterministic() {
        let ids = SequenceIds::default();
        assert_eq!(ids.transaction_number(fixed_instant()), "TXN202601150930420001");
        assert_eq!(ids.barcode(), "SEQ0000002");
    }
}
