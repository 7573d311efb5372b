use rand::RngCore;

use crate::constants::{KDF_CONTEXT_PASSWORD, SALT_SIZE};
use crate::error::SharedError;

// BLAKE3 KDF over salt || password, stored as `salt_hex$hash_hex`
fn derive(salt: &[u8], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let hash = derive(&salt, password);
    format!("{}${}", hex::encode(salt), hash.to_hex())
}

/// Check `password` against a stored hash. Comparison is constant-time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, SharedError> {
    let (salt_hex, hash_hex) = stored
        .split_once('$')
        .ok_or_else(|| SharedError::PasswordHash("missing separator".into()))?;
    let salt = hex::decode(salt_hex).map_err(|e| SharedError::PasswordHash(e.to_string()))?;
    let expected =
        blake3::Hash::from_hex(hash_hex).map_err(|e| SharedError::PasswordHash(e.to_string()))?;

    // blake3::Hash equality is constant-time
    Ok(derive(&salt, password) == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored).unwrap());
        assert!(!verify_password("hunter23", &stored).unwrap());
    }

    #[test]
    fn test_salt_differs_per_hash() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_stored_format() {
        let stored = hash_password("pw");
        let (salt, hash) = stored.split_once('$').unwrap();
        assert_eq!(salt.len(), SALT_SIZE * 2);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_malformed_stored_hash() {
        assert!(verify_password("pw", "nodollar").is_err());
        assert!(verify_password("pw", "zz$00").is_err());
    }
}
