use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// A bearer token with its derived expiry.
///
/// Valid while `now < expires_at`. The expiry already has the refresh
/// safety margin subtracted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Derive a credential from a token grant received at `issued_at`.
    pub fn issue(grant: TokenGrant, issued_at: DateTime<Utc>, safety_margin: Duration) -> Self {
        let usable = grant
            .lifetime
            .checked_sub(&safety_margin)
            .unwrap_or(Duration::zero())
            .max(Duration::zero());
        Self {
            token: grant.access_token,
            created_at: issued_at,
            // Lifetimes past the calendar range never expire.
            expires_at: issued_at
                .checked_add_signed(usable)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token and lifetime as granted by the provider.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub lifetime: Duration,
}

/// Body of the client-credentials token exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,

    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_subtracts_safety_margin() {
        let issued_at = Utc::now();
        let credential = Credential::issue(
            TokenGrant {
                access_token: "t".to_string(),
                lifetime: Duration::seconds(1800),
            },
            issued_at,
            Duration::seconds(300),
        );

        assert_eq!(credential.expires_at, issued_at + Duration::seconds(1500));
        assert!(credential.is_valid_at(issued_at + Duration::seconds(1499)));
        assert!(!credential.is_valid_at(issued_at + Duration::seconds(1500)));
    }

    #[test]
    fn test_short_lifetime_expires_immediately() {
        let issued_at = Utc::now();
        let credential = Credential::issue(
            TokenGrant {
                access_token: "t".to_string(),
                lifetime: Duration::seconds(120),
            },
            issued_at,
            Duration::seconds(300),
        );
        assert!(!credential.is_valid_at(issued_at));
    }

    #[test]
    fn test_lifetime_beyond_calendar_saturates() {
        let issued_at = Utc::now();
        let credential = Credential::issue(
            TokenGrant {
                access_token: "t".to_string(),
                lifetime: Duration::MAX,
            },
            issued_at,
            Duration::seconds(300),
        );
        assert_eq!(credential.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(credential.is_valid_at(issued_at + Duration::days(365)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::issue(
            TokenGrant {
                access_token: "secret-token".to_string(),
                lifetime: Duration::seconds(60),
            },
            Utc::now(),
            Duration::zero(),
        );
        assert!(!format!("{:?}", credential).contains("secret-token"));
    }
}
