use std::fmt;

/// Account role. Only students carry biometric gates; teachers and
/// admins authenticate with password alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// True when this role is subject to the biometric stages.
    pub fn requires_biometrics(&self) -> bool {
        matches!(self, Role::Student)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user identity as supplied by the external credential store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Opaque user id; keys every model store lookup.
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// Credential-check capability owned by the surrounding platform.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait CredentialStore: Send + Sync {
    /// Looks a user up by username.
    fn find_user(&self, username: &str) -> Option<UserRecord>;

    /// Checks a password for a user id.
    fn check_password(&self, user_id: &str, secret: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_students_need_biometrics() {
        assert!(Role::Student.requires_biometrics());
        assert!(!Role::Teacher.requires_biometrics());
        assert!(!Role::Admin.requires_biometrics());
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Student.to_string(), "student");
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
