//! Caller identity.

use std::collections::BTreeSet;

/// The authenticated principal on whose behalf an operation runs.
///
/// Authentication happens outside the service; the service only checks
/// roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    name: Option<String>,
    roles: BTreeSet<String>,
}

impl Caller {
    /// Creates a named caller without roles.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            roles: BTreeSet::new(),
        }
    }

    /// Creates an unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Principal name, if authenticated.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if the caller has the role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        let caller = Caller::new("scanner").with_role("registry-ws");
        assert!(caller.has_role("registry-ws"));
        assert!(!caller.has_role("admin"));
        assert_eq!(caller.name(), Some("scanner"));
        assert!(!Caller::anonymous().has_role("registry-ws"));
    }
}
