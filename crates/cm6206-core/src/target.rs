//! Identity of the chip this tool activates.

use std::fmt;

/// A USB vendor/product pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetIdentity {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
}

impl TargetIdentity {
    /// Check whether a device descriptor's IDs belong to this target.
    #[must_use]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// C-Media CM6206 (also sold as Zalman ZM-RS6F and countless no-name 5.1 adapters).
pub const CM6206: TargetIdentity = TargetIdentity { vendor_id: 0x0d8c, product_id: 0x0102 };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_exact_pair_only() {
        assert!(CM6206.matches(0x0d8c, 0x0102));
        assert!(!CM6206.matches(0x0d8c, 0x0103));
        assert!(!CM6206.matches(0x0d8d, 0x0102));
    }

    #[test]
    fn test_display_is_lsusb_style() {
        assert_eq!(CM6206.to_string(), "0d8c:0102");
    }
}
