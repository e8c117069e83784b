use std::sync::Arc;

use mongodb::Client;

use crate::config::Config;
use crate::store::Store;
use crate::trailhead::Trailhead;

/// An app wired to a database nothing listens on. The driver only
/// connects when an operation runs, so this is fine for any route
/// that must bail out before data access.
pub async fn create_app() -> Arc<Trailhead> {
    // Short timeouts: a test that reaches data access by mistake
    // should fail in milliseconds, not hang on server selection.
    let client = Client::with_uri_str(
        "mongodb://127.0.0.1:27017/?serverSelectionTimeoutMS=500&connectTimeoutMS=500",
    )
    .await
    .expect("client setup");

    let config = Config {
        mongodb_host: "127.0.0.1".into(),
        mongodb_user: "test".into(),
        mongodb_password: "test".into(),
        mongodb_database: "trailhead-test".into(),
        session_secret: "test-session-secret".into(),
        session_store_secret: "test-store-secret".into(),
    };

    let store = Store::with_database(client.database(&config.mongodb_database));

    Arc::new(Trailhead::new(store, config))
}
