//! Customer self-signup on a tenant origin.

use serde::Serialize;

use crate::dto::Ack;
use crate::endpoints::CUSTOMER_SIGNUP;
use crate::http::{ApiClient, Method, ORIGIN_HEADER};
use crate::ApiError;

/// Header carrying the anti-automation (captcha) token.
pub const RECAPTCHA_HEADER: &str = "X-Recaptcha-Token";
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Body of `POST /api/tenants/customer/signup`.
///
/// The phone number doubles as the username.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSignup {
    first_name: String,
    last_name: String,
    email_id: String,
    phone_number: String,
    password: String,
    username: String,
    country_code: String,
    /// Birthday as `DD/MM`.
    dob: String,
}

impl CustomerSignup {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        phone_number: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let phone_number = phone_number.into();
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email_id: email.into(),
            username: phone_number.clone(),
            phone_number,
            password: password.into(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            dob: String::new(),
        }
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        if !code.trim().is_empty() {
            self.country_code = code;
        }
        self
    }

    /// Set the birthday (year is not collected).
    pub fn with_birthday(mut self, day: u8, month: u8) -> Result<Self, ApiError> {
        if !(1..=12).contains(&month) || !(1..=days_in_month(month)).contains(&day) {
            return Err(ApiError::Validation(format!("invalid birthday {day:02}/{month:02}")));
        }
        self.dob = format!("{day:02}/{month:02}");
        Ok(self)
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.first_name.trim().is_empty() {
            return Err(ApiError::Validation("first name is required".to_string()));
        }
        if self.email_id.trim().is_empty() {
            return Err(ApiError::Validation("email is required".to_string()));
        }
        if self.phone_number.trim().is_empty() {
            return Err(ApiError::Validation("phone number is required".to_string()));
        }
        if self.dob.is_empty() {
            return Err(ApiError::Validation("birthday is required".to_string()));
        }
        Ok(())
    }
}

impl core::fmt::Debug for CustomerSignup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CustomerSignup")
            .field("email_id", &self.email_id)
            .field("country_code", &self.country_code)
            .finish_non_exhaustive()
    }
}

// Leap day allowed: no year is collected.
fn days_in_month(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Register a customer. Unauthenticated; the tenant origin is always sent.
pub async fn signup(
    client: &ApiClient,
    signup: &CustomerSignup,
    recaptcha_token: &str,
) -> Result<Option<String>, ApiError> {
    signup.validate()?;
    let body = serde_json::to_value(signup)
        .map_err(|e| ApiError::Validation(format!("invalid signup: {e}")))?;

    let tenant = client.tenant().as_str();
    let mut headers = vec![(RECAPTCHA_HEADER, recaptcha_token)];
    if !client.is_multi_tenant() {
        headers.push((ORIGIN_HEADER, tenant));
    }

    let ack: Ack = client
        .request(Method::POST, CUSTOMER_SIGNUP, None, Some(&body), &headers)
        .await?;
    tracing::info!(tenant, "customer signed up");
    ack.confirm("Signup failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_phone_as_username() {
        let signup = CustomerSignup::new("Ada", "L", "ada@acme.io", "5550100", "pw")
            .with_birthday(3, 7)
            .unwrap();
        let body = serde_json::to_value(&signup).unwrap();
        assert_eq!(body["username"], "5550100");
        assert_eq!(body["countryCode"], "91");
        assert_eq!(body["dob"], "03/07");
        assert_eq!(body["emailId"], "ada@acme.io");
    }

    #[test]
    fn birthday_is_checked() {
        let base = CustomerSignup::new("Ada", "L", "ada@acme.io", "5550100", "pw");
        assert!(base.clone().with_birthday(31, 4).is_err());
        assert!(base.clone().with_birthday(29, 2).is_ok());
        assert!(base.clone().with_birthday(1, 13).is_err());
        assert!(base.validate().is_err());
    }

    #[test]
    fn blank_country_code_keeps_default() {
        let signup = CustomerSignup::new("a", "b", "c@d.io", "1", "pw").with_country_code(" ");
        assert_eq!(signup.country_code, DEFAULT_COUNTRY_CODE);
    }
}
