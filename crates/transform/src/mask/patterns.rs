//! Built-in PII patterns

use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement for every matched value
pub const MASK: &str = "###";

/// US Social Security Number: XXX-XX-XXXX
pub static SSN_US: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap());

/// US phone number: NXX-XXX-XXXX with N in 2-9
pub static PHONE_US: Lazy<Regex> = Lazy::new(|| Regex::new(r"[2-9]\d{2}-\d{3}-\d{4}").unwrap());

/// Patterns in the order they are applied
pub fn patterns() -> [&'static Regex; 2] {
    [&SSN_US, &PHONE_US]
}
