//! Paths into the domain-object graph assembled from a result.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Position of a node in the graph being assembled, e.g.
/// `Customer.address.city`.
///
/// Equality and hashing use the full path only.
#[derive(Clone)]
pub struct NavigablePath {
    parent: Option<Arc<NavigablePath>>,
    local_name: String,
    full_path: String,
}

impl NavigablePath {
    /// A root path.
    pub fn new(root: impl Into<String>) -> Self {
        let local_name = root.into();
        Self {
            parent: None,
            full_path: local_name.clone(),
            local_name,
        }
    }

    /// A child path named `name`.
    pub fn append(&self, name: &str) -> Self {
        Self {
            parent: Some(Arc::new(self.clone())),
            local_name: name.to_string(),
            full_path: format!("{}.{}", self.full_path, name),
        }
    }

    pub fn parent(&self) -> Option<&NavigablePath> {
        self.parent.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Local names from the root down to this node.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(path) = current {
            segments.push(path.local_name.as_str());
            current = path.parent();
        }
        segments.reverse();
        segments
    }

    /// Path of this node relative to `ancestor`, dotted.
    pub fn relative_to(&self, ancestor: &NavigablePath) -> Option<&str> {
        self.full_path
            .strip_prefix(ancestor.full_path())
            .and_then(|rest| rest.strip_prefix('.'))
    }
}

impl PartialEq for NavigablePath {
    fn eq(&self, other: &Self) -> bool {
        self.full_path == other.full_path
    }
}

impl Eq for NavigablePath {}

impl Hash for NavigablePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_path.hash(state);
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

impl fmt::Debug for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigablePath[{}]", self.full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_builds_full_path() {
        let root = NavigablePath::new("Customer");
        let city = root.append("address").append("city");
        assert_eq!(city.full_path(), "Customer.address.city");
        assert_eq!(city.local_name(), "city");
        assert_eq!(city.parent().unwrap().full_path(), "Customer.address");
        assert_eq!(city.segments(), vec!["Customer", "address", "city"]);
        assert!(root.is_root());
        assert!(!city.is_root());
    }

    #[test]
    fn test_relative_to() {
        let root = NavigablePath::new("Customer");
        let city = root.append("address").append("city");
        assert_eq!(city.relative_to(&root), Some("address.city"));
        assert_eq!(root.relative_to(&root), None);
        assert_eq!(city.relative_to(&NavigablePath::new("Order")), None);
    }

    #[test]
    fn test_equality_uses_full_path() {
        let a = NavigablePath::new("Customer").append("name");
        let b = NavigablePath::new("Customer").append("name");
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
