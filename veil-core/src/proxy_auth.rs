//! Upstream proxy authentication.
//!
//! The authenticator answers every challenge synchronously from a
//! pre-provisioned credential record; it never prompts.
//!
//! SECURITY: the password is zeroized on drop and never appears in `Debug`
//! output or log lines.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VeilError};

#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl ProxyCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let credentials = Self {
            username: username.into(),
            password: password.into(),
        };
        if credentials.username.is_empty() {
            return Err(VeilError::InvalidProfile("proxy username is empty".into()));
        }
        Ok(credentials)
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authentication challenge raised for a proxied request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    pub url: String,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default)]
    pub is_proxy: bool,
}

/// Response shape expected by the host's auth hook.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse<'a> {
    pub auth_credentials: AuthCredentials<'a>,
}

#[derive(Serialize)]
pub struct AuthCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

pub struct ProxyAuthenticator {
    credentials: ProxyCredentials,
}

impl ProxyAuthenticator {
    pub fn new(credentials: ProxyCredentials) -> Self {
        Self { credentials }
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn respond(&self, challenge: &AuthChallenge) -> AuthResponse<'_> {
        log::info!(
            "auth challenge for {} (realm {:?}), answering as {}",
            challenge.url,
            challenge.realm,
            self.credentials.username
        );
        AuthResponse {
            auth_credentials: AuthCredentials {
                username: &self.credentials.username,
                password: &self.credentials.password,
            },
        }
    }

    /// Observation hook for early request events; never blocks.
    pub fn observe_request(&self, url: &str) {
        log::trace!("request via proxy: {}", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_returns_fixed_pair() {
        let auth = ProxyAuthenticator::new(ProxyCredentials::new("alice", "hunter2").unwrap());
        let challenge = AuthChallenge {
            url: "https://example.com/".into(),
            realm: Some("proxy".into()),
            is_proxy: true,
        };
        let response = auth.respond(&challenge);
        assert_eq!(response.auth_credentials.username, "alice");
        assert_eq!(response.auth_credentials.password, "hunter2");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["authCredentials"]["username"], "alice");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = ProxyCredentials::new("alice", "hunter2").unwrap();
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_zeroize() {
        let mut credentials = ProxyCredentials::new("alice", "hunter2").unwrap();
        credentials.zeroize();
        assert!(credentials.username.is_empty());
        assert!(credentials.password.is_empty());
    }

    #[test]
    fn test_empty_username_rejected() {
        assert!(ProxyCredentials::new("", "pw").is_err());
    }

    #[test]
    fn test_challenge_from_host_json() {
        let challenge: AuthChallenge =
            serde_json::from_str(r#"{"url": "http://a.test/", "isProxy": true, "requestId": "7"}"#).unwrap();
        assert!(challenge.is_proxy);
        assert_eq!(challenge.realm, None);
    }
}
