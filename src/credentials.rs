use log::error;

/// bcrypt work factor for newly stored passwords.
const COST: u32 = 12;

pub fn hash(plaintext: &str) -> Result<String, ()> {
    bcrypt::hash(plaintext, COST).map_err(|e| {
        error!("couldn't hash password: {e:?}");
    })
}

/// Constant-time check of a supplied plaintext against a stored hash.
/// Verify errors count as a non-match.
pub fn matches(plaintext: &str, stored: &str) -> bool {
    match bcrypt::verify(plaintext, stored) {
        Ok(matched) => matched,
        Err(e) => {
            error!("couldn't verify password: {e:?}");
            false
        }
    }
}
