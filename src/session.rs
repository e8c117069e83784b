use std::fmt;
use std::str::FromStr;

use cookie::Cookie;
use log::error;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";

/// Sessions last an hour from creation.
const TTL_SECS: i64 = 60 * 60;

/// Server-side session state, persisted so it survives process
/// restarts. `expires_at` is also the field the store's TTL index
/// sweeps on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub key: String,
    pub authenticated: bool,
    pub username: String,
    pub email: String,
    pub expires_at: DateTime,
}

impl Session {
    pub fn start(key: String, username: String, email: String) -> Self {
        let expires_at =
            DateTime::from_millis(DateTime::now().timestamp_millis() + TTL_SECS * 1000);

        Self {
            key,
            authenticated: true,
            username,
            email,
            expires_at,
        }
    }

    /// The TTL sweep only runs periodically, so reads must check too.
    pub fn expired(&self) -> bool {
        self.expires_at <= DateTime::now()
    }
}

/// The random identifier behind a session cookie. Clients only ever
/// see it signed; the store only ever sees it hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// `<id>.<sig>`, the signature binding the id to our secret.
    pub fn cookie_value(&self, secret: &str) -> String {
        let id = self.0;
        format!("{id}.{}", sign(&id.to_string(), secret))
    }

    /// Rejects values whose signature doesn't check out; a tampered
    /// cookie never reaches the store.
    pub fn from_cookie(value: &str, secret: &str) -> Option<Self> {
        let (id, sig) = value.split_once('.')?;

        if sign(id, secret) != sig {
            error!("session cookie with a bad signature");
            return None;
        }

        Uuid::from_str(id).ok().map(Self)
    }

    /// The key the session record is stored under. Derived with its
    /// own secret, so database contents alone can't be replayed as
    /// cookies.
    pub fn store_key(&self, store_secret: &str) -> String {
        sign(&self.0.to_string(), store_secret)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

fn sign(value: &str, secret: &str) -> String {
    sha256::digest(format!("{value}:{secret}"))
}

/// The cookie handed out on signup and login.
pub fn cookie(value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::seconds(TTL_SECS))
        .build()
}

/// An immediately-expiring cookie, sent on logout.
pub fn clear_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "cookie-secret";

    #[test]
    fn cookie_value_round_trips() {
        let id = SessionId::new();
        let value = id.cookie_value(SECRET);

        assert_eq!(SessionId::from_cookie(&value, SECRET), Some(id));
    }

    #[test]
    fn tampered_cookies_are_rejected() {
        let id = SessionId::new();
        let value = id.cookie_value(SECRET);

        let (raw_id, _) = value.split_once('.').unwrap();
        let other = SessionId::new().cookie_value(SECRET);
        let (_, other_sig) = other.split_once('.').unwrap();
        let forged = format!("{raw_id}.{other_sig}");

        assert_eq!(SessionId::from_cookie(&forged, SECRET), None);
        assert_eq!(SessionId::from_cookie(&value, "another-secret"), None);
        assert_eq!(SessionId::from_cookie("garbage", SECRET), None);
    }

    #[test]
    fn store_key_is_not_derivable_from_the_cookie() {
        let id = SessionId::new();
        let key = id.store_key("store-secret");

        assert!(!id.cookie_value(SECRET).contains(&key));
        assert_ne!(key, id.cookie_value(SECRET));
    }

    #[test]
    fn fresh_sessions_are_authenticated_and_unexpired() {
        let session = Session::start("key".into(), "alice".into(), "a@b.com".into());

        assert!(session.authenticated);
        assert!(!session.expired());
    }

    #[test]
    fn already_elapsed_sessions_read_as_expired() {
        let mut session = Session::start("key".into(), "alice".into(), "a@b.com".into());
        session.expires_at = DateTime::from_millis(0);

        assert!(session.expired());
    }

    #[test]
    fn cookie_attributes() {
        let secure = cookie("value", true).to_string();
        assert!(secure.contains("HttpOnly"));
        assert!(secure.contains("Secure"));
        assert!(secure.contains("Path=/"));
        assert!(secure.contains("Max-Age=3600"));

        let plain = cookie("value", false).to_string();
        assert!(!plain.contains("Secure"));

        let cleared = clear_cookie(false).to_string();
        assert!(cleared.contains("Max-Age=0"));
    }
}
