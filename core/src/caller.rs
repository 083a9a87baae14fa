//! The authenticated identity a request acts on behalf of.
//!
//! Authentication itself happens upstream; services only receive the
//! resulting `{user_id, role}` pair.

use crate::error::RentalError;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of an authenticated caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Administrator; may act on any booking.
    Admin,
}

impl Role {
    /// String form used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(RentalError::BadRequest(format!("Unknown role '{other}'"))),
        }
    }
}

/// An authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Authenticated user.
    pub user_id: UserId,
    /// Role granted by the session.
    pub role: Role,
}

impl Caller {
    /// A regular customer.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// An administrator.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether the caller may act on a resource owned by `owner`.
    #[must_use]
    pub fn may_access(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }

    /// Ownership gate.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::Forbidden`] when the caller neither owns the
    /// resource nor is an admin.
    pub fn ensure_access(&self, owner: UserId) -> Result<(), RentalError> {
        if self.may_access(owner) {
            Ok(())
        } else {
            Err(RentalError::Forbidden(
                "You do not have permission to access this resource".to_string(),
            ))
        }
    }

    /// Owner filter for list queries: `None` for admins (see everything),
    /// the caller's own id otherwise.
    #[must_use]
    pub const fn scope(&self) -> Option<UserId> {
        if self.is_admin() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_pass_the_gate() {
        let owner = UserId::new();
        assert!(Caller::user(owner).ensure_access(owner).is_ok());
        assert!(Caller::admin(UserId::new()).ensure_access(owner).is_ok());
    }

    #[test]
    fn test_stranger_is_forbidden() {
        let err = Caller::user(UserId::new())
            .ensure_access(UserId::new())
            .err();
        assert!(matches!(err, Some(RentalError::Forbidden(_))));
    }

    #[test]
    fn test_scope() {
        let id = UserId::new();
        assert_eq!(Caller::user(id).scope(), Some(id));
        assert_eq!(Caller::admin(id).scope(), None);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().ok(), Some(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }
}
