//! Per-request identity.

use serde::{Deserialize, Serialize};

use bookstore_core::{Role, UserId};

/// The authenticated caller, decoded from the bearer token.
///
/// Built once per request by the auth extractors and passed explicitly to
/// handlers and services. Premium status here is informational; pricing always
/// re-reads the user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// User's database ID.
    pub user_id: UserId,
    /// Email at token issue time.
    pub email: String,
    /// Role at token issue time.
    pub role: Role,
    /// Premium flag at token issue time.
    pub is_premium: bool,
}

impl AuthContext {
    /// Whether the caller may act on a resource owned by `owner`.
    #[must_use]
    pub fn owns(&self, owner: UserId) -> bool {
        self.user_id == owner
    }

    /// Owners and staff may read an owned resource.
    #[must_use]
    pub fn can_view(&self, owner: UserId) -> bool {
        self.owns(owner) || self.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: UserId::generate(),
            email: "reader@example.com".to_string(),
            role,
            is_premium: false,
        }
    }

    #[test]
    fn test_owner_can_view() {
        let me = ctx(Role::Customer);
        assert!(me.can_view(me.user_id));
        assert!(!me.can_view(UserId::generate()));
    }

    #[test]
    fn test_staff_can_view_any() {
        assert!(ctx(Role::Admin).can_view(UserId::generate()));
        assert!(ctx(Role::Moderator).can_view(UserId::generate()));
    }

    #[test]
    fn test_staff_do_not_own_others() {
        assert!(!ctx(Role::Admin).owns(UserId::generate()));
    }
}
