//! Session tokens carried by the `session` cookie.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::middleware::{AuthError, Identity, SessionVerifier};
use crate::user::UserId;

pub const SESSION_COOKIE: &str = "session";
const BEARER: &str = "Bearer ";

/// Pieces of information asserted on a session token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time, in seconds since epoch.
    pub exp: u64,
    /// Identifies the time at which the token was issued.
    pub iat: u64,
    /// Identifies the instance that issued the token.
    pub iss: String,
    /// User ID.
    pub sub: String,
    /// Email address the user logged in with.
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("system clock is before unix epoch")]
    Clock(#[from] std::time::SystemTimeError),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("cookie value is not valid header")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
    #[error("session lifetime of {0} seconds overflows the expiration time")]
    Lifetime(u64),
}

/// Issue and check session tokens.
#[derive(Clone)]
pub struct SessionManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: u64,
    secure: bool,
}

impl SessionManager {
    /// Create a new [`SessionManager`] signing with `secret`.
    pub fn new(issuer: &str, secret: &str, lifetime: u64) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
            lifetime,
            secure: false,
        }
    }

    /// Mark issued cookies as `Secure`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Lifetime of issued sessions, in seconds.
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Create a new session token for `user_id`.
    pub fn create(&self, user_id: UserId, email: &str) -> Result<String, SessionError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        self.create_at(user_id, email, now)
    }

    fn create_at(&self, user_id: UserId, email: &str, now: u64) -> Result<String, SessionError> {
        let exp = now
            .checked_add(self.lifetime)
            .ok_or(SessionError::Lifetime(self.lifetime))?;
        let claims = Claims {
            exp,
            iat: now,
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            email: email.to_owned(),
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    fn set_cookie(&self, token: &str, max_age: u64) -> Result<HeaderValue, SessionError> {
        let secure = if self.secure { "; Secure" } else { "" };
        Ok(HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={token}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax{secure}"
        ))?)
    }

    /// `Set-Cookie` value installing `token`.
    pub fn cookie(&self, token: &str) -> Result<HeaderValue, SessionError> {
        self.set_cookie(token, self.lifetime)
    }

    /// `Set-Cookie` value removing the session, with the same attributes
    /// as the cookie it replaces.
    pub fn expired_cookie(&self) -> Result<HeaderValue, SessionError> {
        self.set_cookie("", 0)
    }
}

/// Find the session token in the `Cookie` header, or as a bearer token.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER))
            .map(str::to_owned)
    })
}

#[async_trait]
impl SessionVerifier for SessionManager {
    async fn verify(&self, parts: &Parts) -> Result<Identity, AuthError> {
        let token = extract_token(&parts.headers).ok_or(AuthError::Missing)?;
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let claims = self.decode(&token).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::Malformed
            },
            _ => AuthError::Invalid,
        })?;

        let user_id = claims.sub.parse().map_err(|_| AuthError::Malformed)?;

        Ok(Identity {
            user_id: UserId::new(user_id),
            email_address: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    const SECRET: &str = "test secret";

    fn manager() -> SessionManager {
        SessionManager::new("cerealnotes", SECRET, 3600)
    }

    fn parts(header_name: header::HeaderName, value: &str) -> Parts {
        Request::builder()
            .uri("/")
            .header(header_name, value)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_cookie_round_trip() {
        let sessions = manager();
        let token = sessions.create(UserId::new(7), "ada@example.com").unwrap();

        let parts = parts(header::COOKIE, &format!("theme=dark; session={token}"));
        let identity = sessions.verify(&parts).await.unwrap();
        assert_eq!(identity.user_id, UserId::new(7));
        assert_eq!(identity.email_address, "ada@example.com");
    }

    #[tokio::test]
    async fn test_bearer_fallback() {
        let sessions = manager();
        let token = sessions.create(UserId::new(1), "a@example.com").unwrap();

        let parts = parts(header::AUTHORIZATION, &format!("Bearer {token}"));
        assert!(sessions.verify(&parts).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let parts = Request::builder().body(()).unwrap().into_parts().0;
        assert_eq!(manager().verify(&parts).await.unwrap_err(), AuthError::Missing);

        let parts = parts_with_cookie("session=");
        assert_eq!(manager().verify(&parts).await.unwrap_err(), AuthError::Missing);
    }

    fn parts_with_cookie(cookie: &str) -> Parts {
        parts(header::COOKIE, cookie)
    }

    #[tokio::test]
    async fn test_malformed_session() {
        let parts = parts_with_cookie("session=not-a-token");
        assert_eq!(manager().verify(&parts).await.unwrap_err(), AuthError::Malformed);
    }

    #[tokio::test]
    async fn test_expired_session() {
        let sessions = manager();
        let token = sessions
            .create_at(UserId::new(1), "a@example.com", 1_000)
            .unwrap();

        let parts = parts_with_cookie(&format!("session={token}"));
        assert_eq!(sessions.verify(&parts).await.unwrap_err(), AuthError::Expired);
    }

    #[tokio::test]
    async fn test_foreign_signature() {
        let token = SessionManager::new("cerealnotes", "other secret", 3600)
            .create(UserId::new(1), "a@example.com")
            .unwrap();

        let parts = parts_with_cookie(&format!("session={token}"));
        assert_eq!(manager().verify(&parts).await.unwrap_err(), AuthError::Invalid);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = manager().secure(true).cookie("abc").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_expired_cookie_matches_session_cookie() {
        let sessions = manager().secure(true);
        let cookie = sessions.cookie("abc").unwrap();
        let expired = sessions.expired_cookie().unwrap();

        let attributes = |value: &HeaderValue| {
            value
                .to_str()
                .unwrap()
                .split("; ")
                .skip(1)
                .filter(|attr| !attr.starts_with("Max-Age="))
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };
        assert!(expired.to_str().unwrap().starts_with("session=;"));
        assert!(expired.to_str().unwrap().contains("Max-Age=0"));
        assert_eq!(attributes(&expired), attributes(&cookie));
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let sessions = SessionManager::new("cerealnotes", SECRET, u64::MAX);
        let err = sessions.create(UserId::new(1), "a@example.com").unwrap_err();
        assert!(matches!(err, SessionError::Lifetime(u64::MAX)));
    }
}
