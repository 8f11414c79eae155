//! Utility functions for mutasibank operations.
//!
//! This module provides signing helpers, timestamp handling, environment lookups,
//! and other small pieces shared by the client and the webhook verifier.

use crate::errors::{MutasibankError, Result};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::Sha256;
use std::str::FromStr;
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Date format used by every date parameter of the API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of signature characters that may appear in logs.
const SIGNATURE_PREVIEW_LEN: usize = 10;

// Tried in order; the first pattern that matches wins.
static ORDER_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)ORDER[:\-\s]*(\d+)").expect("valid order pattern"),
        Regex::new(r"(?i)TRF\s+(\d+)").expect("valid transfer pattern"),
        Regex::new(r"(?i)INV[:\-\s]*(\d+)").expect("valid invoice pattern"),
    ]
});

/// Computes the raw HMAC-SHA256 of `payload` keyed with `secret`.
pub fn hmac_sha256(secret: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Computes the hex-encoded HMAC-SHA256 signature the webhook sender puts in
/// `X-Mutasibank-Signature`.
///
/// # Examples
///
/// ```
/// use mutasibank::utils::compute_signature;
///
/// let signature = compute_signature("secret", br#"{"data_mutasi":[]}"#);
/// assert_eq!(signature.len(), 64);
/// assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn compute_signature(secret: impl AsRef<[u8]>, payload: &[u8]) -> String {
    hex::encode(hmac_sha256(secret.as_ref(), payload))
}

/// Compares two byte strings in constant time.
///
/// The length check leaks only the length, which is public (32 bytes for SHA-256).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Shortens a signature for logging: the first ten characters followed by `...`.
///
/// # Examples
///
/// ```
/// use mutasibank::utils::signature_preview;
///
/// assert_eq!(signature_preview("0123456789abcdef"), "0123456789...");
/// assert_eq!(signature_preview("abc"), "abc...");
/// ```
pub fn signature_preview(signature: &str) -> String {
    let prefix: String = signature.chars().take(SIGNATURE_PREVIEW_LEN).collect();
    format!("{}...", prefix)
}

/// Gets the current Unix timestamp in seconds.
///
/// # Examples
///
/// ```
/// use mutasibank::utils::current_timestamp;
///
/// let now = current_timestamp();
/// assert!(now > 1600000000); // After Sept 2020
/// ```
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Formats a date the way the API expects it (`YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Examples
///
/// ```
/// use mutasibank::utils::parse_date;
///
/// let date = parse_date("2018-11-15").unwrap();
/// assert_eq!(date.to_string(), "2018-11-15");
/// assert!(parse_date("15/11/2018").is_err());
/// ```
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| MutasibankError::Other(format!("Invalid date '{}': {}", s, e)))
}

/// Extracts an order reference from a bank description.
///
/// Recognizes `ORDER<sep><digits>`, `TRF <digits>` and `INV<sep><digits>`, where
/// `<sep>` is any run of `:`, `-` or whitespace (possibly empty). Matching is
/// case-insensitive and the patterns are tried in that order.
///
/// # Examples
///
/// ```
/// use mutasibank::utils::extract_order_reference;
///
/// assert_eq!(extract_order_reference("PAY order-12345 BUDI").as_deref(), Some("12345"));
/// assert_eq!(extract_order_reference("TRF  998 SITI").as_deref(), Some("998"));
/// assert_eq!(extract_order_reference("PAY INV-789").as_deref(), Some("789"));
/// assert_eq!(extract_order_reference("BIAYA ADM"), None);
/// ```
pub fn extract_order_reference(description: &str) -> Option<String> {
    ORDER_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Reads a required, non-empty environment variable.
pub fn env_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MutasibankError::ConfigError(format!("{} is not set", name))),
    }
}

/// Reads an optional environment variable and parses it, falling back to `default`.
pub fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map_err(|_| {
            MutasibankError::ConfigError(format!("{} has an invalid value: {}", name, value))
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_signature_known_vector() {
        // RFC 4231 test case 2
        let signature = compute_signature("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(&[], &[]));
        assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_eq(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn test_signature_preview_never_exceeds_prefix() {
        let signature = compute_signature("secret", b"payload");
        let preview = signature_preview(&signature);
        assert_eq!(preview.len(), SIGNATURE_PREVIEW_LEN + 3);
        assert!(signature.starts_with(preview.trim_end_matches("...")));
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2018, 11, 5).unwrap();
        assert_eq!(format_date(date), "2018-11-05");
    }

    #[test]
    fn test_extract_order_reference_prefers_order_pattern() {
        assert_eq!(
            extract_order_reference("TRF 111 ORDER-222").as_deref(),
            Some("222")
        );
        assert_eq!(extract_order_reference("trf 42").as_deref(), Some("42"));
        assert_eq!(extract_order_reference("ORDER-"), None);
    }

    #[test]
    fn test_extract_order_reference_separators() {
        let cases = [
            ("PAY ORDER: 123", "123"),
            ("PAY ORDER 456", "456"),
            ("PAY order456", "456"),
            ("PAY INV-789", "789"),
            ("inv: 31 ANDI", "31"),
            ("INV 5 TRF 6", "6"),
        ];
        for (description, expected) in cases {
            assert_eq!(
                extract_order_reference(description).as_deref(),
                Some(expected),
                "{}",
                description
            );
        }
        assert_eq!(extract_order_reference("INVOICE"), None);
    }

    #[test]
    fn test_env_parse_default_and_invalid() {
        assert_eq!(env_parse("MUTASIBANK_TEST_UNSET_VARIABLE", 45u64).unwrap(), 45);

        std::env::set_var("MUTASIBANK_TEST_BAD_NUMBER", "soon");
        let err = env_parse::<u64>("MUTASIBANK_TEST_BAD_NUMBER", 45).unwrap_err();
        assert!(matches!(err, MutasibankError::ConfigError(_)));
        std::env::remove_var("MUTASIBANK_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_env_var_rejects_empty() {
        std::env::set_var("MUTASIBANK_TEST_EMPTY", "  ");
        assert!(env_var("MUTASIBANK_TEST_EMPTY").is_err());
        std::env::remove_var("MUTASIBANK_TEST_EMPTY");
    }

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        assert!(ts > 1600000000); // After Sept 2020
    }
}
