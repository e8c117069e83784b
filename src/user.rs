use serde::{Deserialize, Serialize};

/// A signup record. `password` holds the bcrypt hash, never the
/// plaintext.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub password: String,
}
