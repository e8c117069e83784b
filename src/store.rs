use futures::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::config::Config;
use crate::session::Session;
use crate::user::User;

type Result<T> = std::result::Result<T, ()>;

/// Single-document reads and writes against the two collections.
/// No transactions, no retries; every operation logs its own failure.
pub struct Store {
    users: Collection<User>,
    sessions: Collection<Session>,
}

impl Store {
    pub async fn connect(config: &Config) -> mongodb::error::Result<Self> {
        let client = Client::with_uri_str(config.mongodb_uri()).await?;
        let store = Self::with_database(client.database(&config.mongodb_database));

        store.ensure_session_expiry().await?;
        info!("connected to {}", config.mongodb_host);

        Ok(store)
    }

    pub fn with_database(database: Database) -> Self {
        Self {
            users: database.collection("users"),
            sessions: database.collection("sessions"),
        }
    }

    /// TTL index so the database reaps expired sessions itself. The
    /// sweep is periodic; reads still check `expires_at`.
    async fn ensure_session_expiry(&self) -> mongodb::error::Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(std::time::Duration::ZERO)
                    .build(),
            )
            .build();

        self.sessions.create_index(index).await.map(|_| ())
    }

    pub async fn insert_user(&self, user: &User) -> Result<()> {
        self.users.insert_one(user).await.map(|_| ()).map_err(|e| {
            error!("couldn't insert user: {e:?}");
        })
    }

    pub async fn users_by_email(&self, email: &str) -> Result<Vec<User>> {
        self.users
            .find(doc! { "email": email })
            .await
            .map_err(|e| {
                error!("couldn't query users by email: {e:?}");
            })?
            .try_collect()
            .await
            .map_err(|e| {
                error!("couldn't read users by email: {e:?}");
            })
    }

    /// The probe endpoint's lookup, projected down to the fields the
    /// demo inspects, so rows come back as raw documents.
    pub async fn users_by_username(&self, username: &str) -> Result<Vec<Document>> {
        self.users
            .clone_with_type::<Document>()
            .find(doc! { "username": username })
            .projection(doc! { "username": 1, "password": 1 })
            .await
            .map_err(|e| {
                error!("couldn't query users by username: {e:?}");
            })?
            .try_collect()
            .await
            .map_err(|e| {
                error!("couldn't read users by username: {e:?}");
            })
    }

    pub async fn put_session(&self, session: &Session) -> Result<()> {
        self.sessions
            .insert_one(session)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("couldn't store session: {e:?}");
            })
    }

    pub async fn session(&self, key: &str) -> Result<Option<Session>> {
        self.sessions
            .find_one(doc! { "_id": key })
            .await
            .map_err(|e| {
                error!("couldn't fetch session: {e:?}");
            })
    }

    pub async fn destroy_session(&self, key: &str) -> Result<()> {
        self.sessions
            .delete_one(doc! { "_id": key })
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("couldn't destroy session: {e:?}");
            })
    }
}
