use log::{debug, info};
use serde::Deserialize;

use crate::config::Config;
use crate::credentials;
use crate::session::{Session, SessionId};
use crate::store::Store;
use crate::user::User;
use crate::validate::{self, Invalid, Param, StringSchema};

/// The application core: the store handle plus the secrets tying
/// cookies to stored sessions. Handlers receive it explicitly, there
/// is no ambient state.
pub struct Trailhead {
    store: Store,
    config: Config,
}

/// What a request's session cookie resolves to.
#[derive(Debug)]
pub enum Visitor {
    Anonymous,
    Member { username: String, email: String },
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub enum SignupOutcome {
    /// Account created, session started. The value is the signed
    /// cookie for it.
    Created { cookie: String },
    Invalid(Invalid),
    Failed,
}

pub enum LoginOutcome {
    LoggedIn { cookie: String },
    /// The one failure the client is told about.
    WrongPassword,
    /// Validation failure, unknown email or ambiguous match. The
    /// client only ever sees a redirect back to the login form.
    Rejected,
}

pub enum ProbeOutcome {
    Usage,
    Detected,
    Greeting(String),
}

impl Trailhead {
    pub fn new(store: Store, config: Config) -> Self {
        Self { store, config }
    }

    /// Resolve the session cookie, if any. Tampered cookies, store
    /// trouble, missing records and stale flags all read as no
    /// session; an expired record is destroyed on sight, best effort.
    pub async fn visitor(&self, cookie: Option<&str>) -> Visitor {
        let Some(value) = cookie else {
            return Visitor::Anonymous;
        };
        let Some(id) = SessionId::from_cookie(value, &self.config.session_secret) else {
            return Visitor::Anonymous;
        };

        let key = id.store_key(&self.config.session_store_secret);
        let session = match self.store.session(&key).await {
            Ok(Some(session)) => session,
            Ok(None) | Err(()) => return Visitor::Anonymous,
        };

        if session.expired() {
            debug!("session for {} expired", session.username);
            let _ = self.store.destroy_session(&key).await;
            return Visitor::Anonymous;
        }

        if !session.authenticated {
            return Visitor::Anonymous;
        }

        Visitor::Member {
            username: session.username,
            email: session.email,
        }
    }

    pub async fn sign_up(&self, form: SignupForm) -> SignupOutcome {
        if let Err(invalid) = validate_signup(&form) {
            info!("rejecting signup: {invalid}");
            return SignupOutcome::Invalid(invalid);
        }

        let SignupForm {
            username: Some(username),
            email: Some(email),
            password: Some(password),
        } = form
        else {
            return SignupOutcome::Failed;
        };

        let Ok(hashed) = credentials::hash(&password) else {
            return SignupOutcome::Failed;
        };

        let user = User {
            username: username.clone(),
            email: email.clone(),
            password: hashed,
        };
        if self.store.insert_user(&user).await.is_err() {
            return SignupOutcome::Failed;
        }
        info!("created user {username}");

        match self.open_session(username, email).await {
            Some(cookie) => SignupOutcome::Created { cookie },
            None => SignupOutcome::Failed,
        }
    }

    pub async fn log_in(&self, form: LoginForm) -> LoginOutcome {
        let email = Param::from_field(form.email.as_deref());

        if let Err(invalid) = StringSchema::string()
            .max(20)
            .required()
            .validate("email", &email)
        {
            info!("rejecting login: {invalid}");
            return LoginOutcome::Rejected;
        }

        let (Param::Str(email), Some(password)) = (email, form.password) else {
            return LoginOutcome::Rejected;
        };

        let Ok(users) = self.store.users_by_email(&email).await else {
            return LoginOutcome::Rejected;
        };

        let [user] = &users[..] else {
            info!("login for {email}: {} matching users", users.len());
            return LoginOutcome::Rejected;
        };

        if !credentials::matches(&password, &user.password) {
            info!("wrong password for {email}");
            return LoginOutcome::WrongPassword;
        }

        info!("{} logged in", user.username);
        match self.open_session(user.username.clone(), email).await {
            Some(cookie) => LoginOutcome::LoggedIn { cookie },
            None => LoginOutcome::Rejected,
        }
    }

    /// Destroy the session behind the cookie, if it checks out.
    /// Failures are logged by the store and swallowed here; the
    /// caller redirects home either way.
    pub async fn log_out(&self, cookie: Option<&str>) {
        let Some(value) = cookie else { return };
        let Some(id) = SessionId::from_cookie(value, &self.config.session_secret) else {
            return;
        };

        let key = id.store_key(&self.config.session_store_secret);
        if self.store.destroy_session(&key).await.is_ok() {
            info!("session {id} destroyed");
        }
    }

    /// The demo lookup: the `user` query parameter is validated
    /// before it is allowed into a find, and smuggled query operators
    /// are called out.
    pub async fn probe(&self, raw_query: &str) -> ProbeOutcome {
        let param = validate::query_param(raw_query, "user");

        let empty = matches!(&param, Param::Str(s) if s.is_empty());
        if param == Param::Missing || empty {
            return ProbeOutcome::Usage;
        }

        if let Err(invalid) = StringSchema::string()
            .max(20)
            .required()
            .validate("user", &param)
        {
            info!("rejecting probe lookup: {invalid}");
            return ProbeOutcome::Detected;
        }

        let Param::Str(username) = param else {
            return ProbeOutcome::Detected;
        };

        info!("probe lookup for {username}");
        if let Ok(users) = self.store.users_by_username(&username).await {
            debug!("probe result: {users:?}");
        }

        ProbeOutcome::Greeting(username)
    }

    /// Persist a fresh authenticated session and return the signed
    /// cookie value for it.
    async fn open_session(&self, username: String, email: String) -> Option<String> {
        let id = SessionId::new();
        let key = id.store_key(&self.config.session_store_secret);
        let session = Session::start(key, username, email);

        self.store.put_session(&session).await.ok()?;

        Some(id.cookie_value(&self.config.session_secret))
    }
}

fn validate_signup(form: &SignupForm) -> Result<(), Invalid> {
    StringSchema::string()
        .alphanum()
        .max(20)
        .required()
        .validate("username", &Param::from_field(form.username.as_deref()))?;

    StringSchema::string()
        .max(20)
        .required()
        .validate("password", &Param::from_field(form.password.as_deref()))?;

    StringSchema::string()
        .email()
        .required()
        .validate("email", &Param::from_field(form.email.as_deref()))
}
