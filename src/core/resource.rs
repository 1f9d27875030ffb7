//! Resource naming.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// An opaque name identifying an external dependency.
///
/// All limiter and breaker state is keyed by resource name; each named
/// resource owns independent state, so misbehavior of one dependency never
/// affects admission decisions for another.
///
/// # Examples
///
/// ```rust
/// use callguard::ResourceName;
///
/// let gemini = ResourceName::new("gemini");
/// let newsapi: ResourceName = "newsapi".into();
/// assert_ne!(gemini, newsapi);
/// assert_eq!(gemini.as_str(), "gemini");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a resource name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_resource_name_display() {
        let name = ResourceName::new("whatsapp");
        assert_eq!(name.to_string(), "whatsapp");
    }

    #[test]
    fn test_resource_name_as_map_key() {
        let mut map: HashMap<ResourceName, u32> = HashMap::new();
        map.insert("gemini".into(), 1);

        // Borrow<str> allows lookup without allocating
        assert_eq!(map.get("gemini"), Some(&1));
        assert_eq!(map.get("newsapi"), None);
    }

    #[test]
    fn test_resource_name_serde() {
        let name = ResourceName::new("newsapi");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"newsapi\"");

        let back: ResourceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
