//! Password hashing for stored credentials. Only the bcrypt output string is
//! ever persisted or logged; the plaintext stays inside these two calls.

/// Hashes a new account password for storage.
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}

/// Checks a login attempt against the stored hash. A stored value that does
/// not parse as a bcrypt hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
