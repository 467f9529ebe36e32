use std::collections::HashSet;

/// Grants high-value discounts past the manager-approval threshold.
pub const PERMISSION_DISCOUNT_OVERRIDE: &str = "discount.override";

/// Identity and permission set for the person driving a checkout call.
/// Threaded explicitly into the engines; there is no ambient security
/// context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Actor {
    name: String,
    permissions: HashSet<String>,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), permissions: HashSet::new() }
    }

    pub fn with_permissions<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut actor = Self::new(name);
        for permission in permissions {
            actor.grant(permission.as_ref());
        }
        actor
    }

    pub fn grant(&mut self, permission: &str) {
        self.permissions.insert(permission.trim().to_ascii_lowercase());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permission codes match case-insensitively.
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(&code.trim().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{Actor, PERMISSION_DISCOUNT_OVERRIDE};

    #[test]
    fn permission_match_is_case_insensitive() {
        let actor = Actor::with_permissions("manager-1", ["Discount.Override"]);
        assert!(actor.has_permission(PERMISSION_DISCOUNT_OVERRIDE));
        assert!(actor.has_permission(" DISCOUNT.OVERRIDE "));
        assert!(!actor.has_permission("till.open"));
    }

    #[test]
    fn plain_actor_has_no_permissions() {
        let actor = Actor::new("cashier-1");
        assert_eq!(actor.name(), "cashier-1");
        assert!(!actor.has_permission(PERMISSION_DISCOUNT_OVERRIDE));
    }
}
