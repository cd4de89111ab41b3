//! Role model and related functionality

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Role carried by a user record and embedded in session tokens.
///
/// The set is closed: a stored value or token claim outside it is rejected
/// instead of being coerced into a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Site operator with access to every protected endpoint
    Admin,
    /// Any other authenticated account
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.as_str(), "user");
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_rejects_unknown_serialized_value() {
        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
