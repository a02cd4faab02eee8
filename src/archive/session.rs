//! Archive sessions and credentials.
//!
//! Credentials are an explicit value handed to the archive adapter. The
//! environment is only read when building configuration.

use std::fmt;

use chrono::Utc;
use rand::Rng;

pub const ACCESS_TOKEN_ENV: &str = "LP_ACCESS_TOKEN";
pub const ACCESS_SECRET_ENV: &str = "LP_ACCESS_SECRET";

/// OAuth access token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// Build from optional halves. Both or neither must be present.
    pub fn from_parts(
        token: Option<String>,
        secret: Option<String>,
    ) -> Result<Option<Self>, SessionError> {
        let token = token.filter(|t| !t.is_empty());
        let secret = secret.filter(|s| !s.is_empty());
        match (token, secret) {
            (Some(token), Some(secret)) => Ok(Some(Self { token, secret })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(SessionError::Incomplete {
                missing: ACCESS_SECRET_ENV,
            }),
            (None, Some(_)) => Err(SessionError::Incomplete {
                missing: ACCESS_TOKEN_ENV,
            }),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(
        "This operation requires archive credentials. Set 'LP_ACCESS_TOKEN' and 'LP_ACCESS_SECRET' or add them to the [credentials] config table"
    )]
    MissingCredentials,

    #[error("Incomplete archive credentials: '{missing}' is not set")]
    Incomplete { missing: &'static str },
}

/// Access mode for one process run.
#[derive(Debug, Clone)]
pub struct Session {
    consumer: String,
    credentials: Option<Credentials>,
}

impl Session {
    pub fn anonymous(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            credentials: None,
        }
    }

    pub fn authenticated(consumer: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            consumer: consumer.into(),
            credentials: Some(credentials),
        }
    }

    /// Use credentials when present. Fails if `required` and none are available.
    pub fn resolve(
        consumer: impl Into<String>,
        credentials: Option<Credentials>,
        required: bool,
    ) -> Result<Self, SessionError> {
        match credentials {
            Some(c) => Ok(Self::authenticated(consumer, c)),
            None if required => Err(SessionError::MissingCredentials),
            None => Ok(Self::anonymous(consumer)),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// OAuth 1.0 PLAINTEXT `Authorization` header, or `None` when anonymous.
    ///
    /// `realm` is the origin of the web service the request goes to.
    pub fn authorization_header(&self, realm: &str) -> Option<String> {
        let creds = self.credentials.as_ref()?;
        let nonce: u64 = rand::thread_rng().gen();
        let timestamp = Utc::now().timestamp();
        Some(format!(
            "OAuth realm=\"{}\", \
             oauth_consumer_key=\"{}\", \
             oauth_token=\"{}\", \
             oauth_signature_method=\"PLAINTEXT\", \
             oauth_signature=\"&{}\", \
             oauth_timestamp=\"{}\", \
             oauth_nonce=\"{}\", \
             oauth_version=\"1.0\"",
            realm,
            percent_encode(&self.consumer),
            percent_encode(&creds.token),
            percent_encode(&creds.secret),
            timestamp,
            nonce,
        ))
    }
}

/// RFC 3986 percent-encoding of everything outside the unreserved set.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert!(Credentials::from_parts(None, None).unwrap().is_none());
        let creds = Credentials::from_parts(Some("t".into()), Some("s".into()))
            .unwrap()
            .unwrap();
        assert_eq!(creds.token, "t");
        assert!(matches!(
            Credentials::from_parts(Some("t".into()), None),
            Err(SessionError::Incomplete { missing: ACCESS_SECRET_ENV })
        ));
        // Empty strings count as unset
        assert!(Credentials::from_parts(Some(String::new()), Some(String::new()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("token123", "hunter2");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("token123"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn test_resolve_required() {
        assert!(matches!(
            Session::resolve("c", None, true),
            Err(SessionError::MissingCredentials)
        ));
        let anon = Session::resolve("c", None, false).unwrap();
        assert!(!anon.is_authenticated());
        assert!(anon.authorization_header("https://api.launchpad.net/").is_none());
    }

    #[test]
    fn test_plaintext_header() {
        let session = Session::authenticated("ppa-steward", Credentials::new("tok", "s&cret"));
        let header = session
            .authorization_header("https://api.staging.launchpad.net/")
            .unwrap();
        assert!(header.starts_with("OAuth realm=\"https://api.staging.launchpad.net/\","));
        assert!(header.contains("oauth_consumer_key=\"ppa-steward\""));
        assert!(header.contains("oauth_token=\"tok\""));
        assert!(header.contains("oauth_signature_method=\"PLAINTEXT\""));
        assert!(header.contains("oauth_signature=\"&s%26cret\""));
    }
}
