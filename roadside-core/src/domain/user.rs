//! User domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Mechanic,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Mechanic => "mechanic",
            Role::Admin => "admin",
        }
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
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "mechanic" => Ok(Role::Mechanic),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Optional profile details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub service_area: Option<String>,
}

/// Public user shape returned by every auth operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            approved: true,
            profile: None,
        }
    }

    /// Identity without a known role or approval, used when the role lookup fails
    pub fn minimal(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: Role::User,
            approved: false,
            profile: None,
        }
    }
}

/// Normalize an email for comparison and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Mechanic".parse::<Role>().unwrap(), Role::Mechanic);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("driver".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_defaults_when_deserializing() {
        let user: User = serde_json::from_str(r#"{"id":"u1","email":"a@x.com"}"#).unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!user.approved);
        assert!(user.profile.is_none());
    }

    #[test]
    fn test_minimal_identity() {
        let user = User::minimal("u1", "a@x.com");
        assert_eq!(user.role, Role::User);
        assert!(!user.approved);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}
