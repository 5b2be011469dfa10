//! Argon2 password hashing and verification

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};

use crate::error::{AuthError, AuthResult};

/// Hashes and verifies passwords as PHC strings
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Argon2id with the crate's recommended parameters
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit cost parameters (memory in KiB)
    pub fn with_params(memory_cost: u32, iterations: u32, parallelism: u32) -> AuthResult<Self> {
        let params = Params::new(memory_cost, iterations, parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("Invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::PasswordHash(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored PHC string
    pub fn verify(&self, password: &str, password_hash: &str) -> AuthResult<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::PasswordHash(format!("Failed to parse password hash: {}", e)))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Do the work of a verification when there is no stored hash, so a
    /// missing account costs as much as a wrong password. Always `false`.
    pub fn verify_unknown_user(&self, password: &str) -> AuthResult<bool> {
        self.hash(password)?;
        Ok(false)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}
