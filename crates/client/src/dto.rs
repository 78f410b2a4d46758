//! Response envelopes shared by every endpoint.

use serde::Deserialize;
use serde_json::Value;

use tenantdesk_auth::{TokenPair, UserProfile};

use crate::ApiError;

/// Success code the backend reports in `code`.
pub const CODE_OK: i64 = 200;

/// `{code?, message?, data}` with a required, typed payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Data<T> {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// `{code?, message?}` for endpoints whose payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    /// The server explicitly reported success.
    pub fn is_confirmed(&self) -> bool {
        self.code == Some(CODE_OK)
    }

    /// Accept a 2xx (or absent) code and return the server's message.
    pub fn confirm(self, failure: &str) -> Result<Option<String>, ApiError> {
        match self.code {
            None => Ok(self.message),
            Some(code) if (200..300).contains(&code) => Ok(self.message),
            Some(_) => Err(self.into_error(failure)),
        }
    }

    /// [`ApiError::Http`] carrying the reported code and the server message,
    /// or `failure` when it sent none.
    pub fn into_error(self, failure: &str) -> ApiError {
        ApiError::Http {
            status: self
                .code
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(500),
            message: self.message.unwrap_or_else(|| failure.to_string()),
            body: Value::Null,
        }
    }
}

/// Payload of `POST /api/users/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub tokens: TokenPair,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_codes() {
        let ok: Ack = serde_json::from_str(r#"{"code":200,"message":"Logged out"}"#).unwrap();
        assert!(ok.is_confirmed());

        let bare: Ack = serde_json::from_str("{}").unwrap();
        assert!(!bare.is_confirmed());
        assert_eq!(bare.confirm("nope").unwrap(), None);

        let failed: Ack = serde_json::from_str(r#"{"code":500}"#).unwrap();
        let err = failed.confirm("Failed to delete role").unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.user_message(), "Failed to delete role");
    }

    #[test]
    fn login_payload_splits_tokens_and_profile() {
        let data: Data<LoginData> = serde_json::from_str(
            r#"{"code":200,"data":{
                "tokens":{"accessToken":"a","refreshToken":"r","accessTokenExpiry":"300","refreshTokenExpiry":"86400"},
                "firstName":"Ada","lastName":"L","emailId":"ada@acme.io","userType":"admin","permissions":[],
                "phoneNumber":"ignored"
            }}"#,
        )
        .unwrap();
        assert_eq!(data.data.tokens.access_token, "a");
        assert_eq!(data.data.profile.email_id, "ada@acme.io");
    }
}
