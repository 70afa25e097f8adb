use derive_more::Display;
use serde::Serialize;
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;

/// Canonical product name shared by both reconciliation sides.
///
/// Always lower-case. Punctuation, percent signs, decimal points and hyphens are preserved
/// verbatim - a hyphen denotes product-spread notation (eg/ `380cst-180cst`).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
pub struct ProductName(pub SmolStr);

impl ProductName {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let name = name.into();
        if name.chars().all(|c| !c.is_ascii_uppercase()) {
            Self(name)
        } else {
            Self(name.to_lowercase_smolstr())
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// `true` if this product expresses a crack spread (eg/ `380cst crack`).
    pub fn is_crack(&self) -> bool {
        self.0.ends_with(" crack")
    }

    /// The underlying product of a crack spread - the tokens preceding `crack`.
    ///
    /// Non-crack products are their own base.
    pub fn base(&self) -> ProductName {
        match self.0.strip_suffix(" crack") {
            Some(base) => ProductName(SmolStr::new(base)),
            None => self.clone(),
        }
    }

    /// Split product-spread notation into its two components.
    ///
    /// Returns `None` unless the name contains a hyphen with non-empty components either side.
    pub fn spread_components(&self) -> Option<(ProductName, ProductName)> {
        let (first, second) = self.0.split_once('-')?;
        let (first, second) = (first.trim(), second.trim());
        if first.is_empty() || second.is_empty() {
            return None;
        }
        Some((ProductName::new(first), ProductName::new(second)))
    }
}

impl From<&str> for ProductName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SmolStr> for ProductName {
    fn from(value: SmolStr) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for ProductName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for ProductName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<'de> serde::de::Deserialize<'de> for ProductName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let name = <&str>::deserialize(deserializer)?;
        Ok(ProductName::new(name))
    }
}
