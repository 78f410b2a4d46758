use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Longest lifetime accepted from the server (ten years).
pub const MAX_EXPIRY_SECONDS: u64 = 10 * 365 * 86_400;

/// Token lifetime in seconds, counted from issuance.
///
/// The identity provider sends these as numeric strings; plain JSON numbers
/// are accepted too.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExpirySeconds(u64);

impl ExpirySeconds {
    pub const fn new(seconds: u64) -> Self {
        Self(seconds)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    fn check(self) -> Result<(), TokenPairError> {
        match self.0 {
            0 => Err(TokenPairError::NonPositiveExpiry),
            s if s > MAX_EXPIRY_SECONDS => Err(TokenPairError::ExpiryOutOfRange(s)),
            _ => Ok(()),
        }
    }

    /// Lifetime in the credential store's day-based unit.
    pub fn to_ttl(self) -> TtlDays {
        TtlDays::from_seconds(self.0)
    }
}

impl<'de> Deserialize<'de> for ExpirySeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(Self)
                .map_err(|e| serde::de::Error::custom(format!("invalid expiry '{s}': {e}"))),
        }
    }
}

/// Entry lifetime in (fractional) days.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct TtlDays(f64);

impl TtlDays {
    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds as f64 / SECONDS_PER_DAY)
    }

    pub fn days(&self) -> f64 {
        self.0
    }

    /// Lifetime in whole seconds (rounded), for computing absolute expiry.
    pub fn as_seconds(&self) -> i64 {
        (self.0 * SECONDS_PER_DAY).round() as i64
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenPairError {
    #[error("token is empty")]
    EmptyToken,

    #[error("token expiry must be positive")]
    NonPositiveExpiry,

    #[error("token expiry of {0}s is out of range")]
    ExpiryOutOfRange(u64),

    #[error("invalid token window (refresh expiry <= access expiry)")]
    InvalidWindow,
}

/// Access/refresh token pair issued at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expiry: ExpirySeconds,
    pub refresh_token_expiry: ExpirySeconds,
}

impl TokenPair {
    /// Check the pair before it is persisted.
    pub fn validate(&self) -> Result<(), TokenPairError> {
        if self.access_token.is_empty() || self.refresh_token.is_empty() {
            return Err(TokenPairError::EmptyToken);
        }
        self.access_token_expiry.check()?;
        self.refresh_token_expiry.check()?;
        if self.refresh_token_expiry <= self.access_token_expiry {
            return Err(TokenPairError::InvalidWindow);
        }
        Ok(())
    }
}

impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// Payload of `POST /api/users/refresh-token`.
///
/// The refresh token is not always rotated; when it is absent the caller
/// keeps the one it already holds.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    pub access_token_expiry: ExpirySeconds,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expiry: Option<ExpirySeconds>,
}

impl RefreshedTokens {
    pub fn validate(&self) -> Result<(), TokenPairError> {
        if self.access_token.is_empty() {
            return Err(TokenPairError::EmptyToken);
        }
        self.access_token_expiry.check()?;
        if let Some(refresh_expiry) = self.refresh_token_expiry {
            refresh_expiry.check()?;
            if refresh_expiry <= self.access_token_expiry {
                return Err(TokenPairError::InvalidWindow);
            }
        }
        Ok(())
    }

    /// The rotated refresh token, if the server issued one with an expiry.
    pub fn rotated(&self) -> Option<(&str, ExpirySeconds)> {
        match (&self.refresh_token, self.refresh_token_expiry) {
            (Some(token), Some(expiry)) if !token.is_empty() => Some((token.as_str(), expiry)),
            _ => None,
        }
    }
}

impl core::fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}
