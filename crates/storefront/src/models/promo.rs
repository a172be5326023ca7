//! Promo code type.

use serde::Serialize;

use clothify_core::DiscountPercent;

/// A discount code. Codes are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_percent: DiscountPercent,
    pub active: bool,
}

/// Normalize user input for lookup: trimmed and upper-cased.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  discount10 "), "DISCOUNT10");
        assert_eq!(normalize_code(""), "");
    }
}
