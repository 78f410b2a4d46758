//! Login credentials and the user profile projection issued at login.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Action, ResourceActions};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("please enter your email")]
    MissingEmail,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("please enter your password")]
    MissingPassword,

    #[error("password must be at least 8 characters long")]
    PasswordTooShort,

    #[error("new password and confirmation do not match")]
    ConfirmationMismatch,
}

/// Email/password pair submitted to `POST /api/users/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    #[serde(rename = "emailId")]
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Client-side form constraints, checked before any request is made.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(CredentialsError::MissingEmail);
        }
        if !looks_like_email(email) {
            return Err(CredentialsError::InvalidEmail);
        }
        validate_password(&self.password)
    }
}

impl core::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn validate_password(password: &str) -> Result<(), CredentialsError> {
    if password.is_empty() {
        return Err(CredentialsError::MissingPassword);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialsError::PasswordTooShort);
    }
    Ok(())
}

// local@domain.tld, no whitespace, exactly one '@'.
fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Body of `PUT /api/users/changePassword`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    old_password: String,
    new_password: String,
}

impl PasswordChange {
    pub fn new(
        old_password: impl Into<String>,
        new_password: impl Into<String>,
        confirm_password: &str,
    ) -> Result<Self, CredentialsError> {
        let old_password = old_password.into();
        let new_password = new_password.into();
        if old_password.is_empty() {
            return Err(CredentialsError::MissingPassword);
        }
        validate_password(&new_password)?;
        if new_password != confirm_password {
            return Err(CredentialsError::ConfirmationMismatch);
        }
        Ok(Self {
            old_password,
            new_password,
        })
    }
}

impl core::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

/// Fixed projection of the login response kept for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email_id: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub permissions: Vec<ResourceActions>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Whether the profile allows `action` on `resource`.
    pub fn can(&self, resource: &str, action: Action) -> bool {
        self.permissions
            .iter()
            .any(|p| p.resource == resource && p.actions.contains(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation() {
        assert_eq!(
            LoginCredentials::new("", "password1").validate(),
            Err(CredentialsError::MissingEmail)
        );
        assert_eq!(
            LoginCredentials::new("bob@", "password1").validate(),
            Err(CredentialsError::InvalidEmail)
        );
        assert_eq!(
            LoginCredentials::new("bob@acme", "password1").validate(),
            Err(CredentialsError::InvalidEmail)
        );
        assert_eq!(
            LoginCredentials::new("bob@acme.io", "").validate(),
            Err(CredentialsError::MissingPassword)
        );
        assert_eq!(
            LoginCredentials::new("bob@acme.io", "short").validate(),
            Err(CredentialsError::PasswordTooShort)
        );
        assert!(LoginCredentials::new("bob@acme.io", "long-enough").validate().is_ok());
    }

    #[test]
    fn credentials_use_wire_field_names() {
        let body = serde_json::to_value(LoginCredentials::new("a@b.co", "secret-pass")).unwrap();
        assert_eq!(body["emailId"], "a@b.co");
        assert_eq!(body["password"], "secret-pass");
        assert!(!format!("{:?}", LoginCredentials::new("a@b.co", "secret-pass")).contains("secret"));
    }

    #[test]
    fn password_change_requires_confirmation() {
        assert_eq!(
            PasswordChange::new("old-pass-1", "new-pass-1", "new-pass-2"),
            Err(CredentialsError::ConfirmationMismatch)
        );
        let change = PasswordChange::new("old-pass-1", "new-pass-1", "new-pass-1").unwrap();
        let body = serde_json::to_value(change).unwrap();
        assert_eq!(body["oldPassword"], "old-pass-1");
        assert_eq!(body["newPassword"], "new-pass-1");
    }

    #[test]
    fn profile_permission_lookup() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"firstName":"Ada","lastName":"L","emailId":"ada@acme.io","userType":"admin",
                "permissions":[{"resource":"bookings","actions":["read","update"]}]}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name(), "Ada L");
        assert!(profile.can("bookings", Action::Update));
        assert!(!profile.can("bookings", Action::Delete));
        assert!(!profile.can("staff", Action::Read));
    }
}
