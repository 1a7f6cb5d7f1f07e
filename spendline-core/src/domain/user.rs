//! User domain model and the signup/login forms

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A registered user as stored under the `users` key.
///
/// Passwords are kept and compared in plaintext; this is a local tracker,
/// not an authentication system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: normalize_email(&email.into()),
            password: password.into(),
        }
    }

    /// The identity carried by a session (no password)
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

/// Emails are the lookup key, so compare them trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Signup form input
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Validate the form against the registered users and build the new user.
    ///
    /// Checks run in the order the signup page reports them: missing fields,
    /// malformed email, password mismatch, then duplicate email.
    pub fn validate(&self, existing: &[User]) -> Result<User> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(Error::validation("Please fill in all fields"));
        }

        let email = normalize_email(&self.email);
        if !email_pattern().is_match(&email) {
            return Err(Error::validation("Please enter a valid email address"));
        }

        if self.password != self.confirm_password {
            return Err(Error::validation("Passwords do not match"));
        }

        if existing.iter().any(|u| normalize_email(&u.email) == email) {
            return Err(Error::validation("Email already in use"));
        }

        Ok(User::new(self.name.trim(), email, self.password.clone()))
    }
}

/// Login form input
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Find the user these credentials belong to
    pub fn authenticate<'a>(&self, users: &'a [User]) -> Result<&'a User> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::validation("Please fill in all fields"));
        }

        let email = normalize_email(&self.email);
        users
            .iter()
            .find(|u| normalize_email(&u.email) == email)
            .filter(|u| u.password_matches(&self.password))
            .ok_or(Error::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn message(err: Error) -> String {
        err.to_string()
    }

    #[test]
    fn test_signup_builds_normalized_user() {
        let user = form(" Ada ", " Ada@Example.com ", "pw", "pw").validate(&[]).unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.profile().email, "ada@example.com");
    }

    #[test]
    fn test_signup_rejections() {
        let existing = vec![User::new("Ada", "ada@example.com", "pw")];

        let err = form("", "a@b.co", "pw", "pw").validate(&existing).unwrap_err();
        assert_eq!(message(err), "Please fill in all fields");

        let err = form("Bob", "not-an-email", "pw", "pw").validate(&existing).unwrap_err();
        assert_eq!(message(err), "Please enter a valid email address");

        let err = form("Bob", "bob@example.com", "pw", "other").validate(&existing).unwrap_err();
        assert_eq!(message(err), "Passwords do not match");

        let err = form("Ada", "ADA@example.com", "pw", "pw").validate(&existing).unwrap_err();
        assert_eq!(message(err), "Email already in use");
    }

    #[test]
    fn test_login_authenticate() {
        let users = vec![User::new("Ada", "ada@example.com", "secret")];

        let found = LoginForm::new("ada@example.com", "secret").authenticate(&users).unwrap();
        assert_eq!(found.name, "Ada");

        assert!(matches!(
            LoginForm::new("ada@example.com", "wrong").authenticate(&users),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            LoginForm::new("nobody@example.com", "secret").authenticate(&users),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            LoginForm::new("", "secret").authenticate(&users),
            Err(Error::Validation(_))
        ));
    }
}
