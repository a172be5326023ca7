//! Product categories and the admin selection rule.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from parsing a [`Category`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// The fixed category vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
    Kids,
    Accessories,
}

impl Category {
    /// Every category, in storefront display order.
    pub const ALL: [Self; 4] = [Self::Men, Self::Women, Self::Kids, Self::Accessories];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Men => "Men",
            Self::Women => "Women",
            Self::Kids => "Kids",
            Self::Accessories => "Accessories",
        }
    }

    /// `Kids` and `Accessories` may not be combined with anything else.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        matches!(self, Self::Kids | Self::Accessories)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("women".parse::<Category>(), Ok(Category::Women));
        assert!("Shoes".parse::<Category>().is_err());
    }
}
