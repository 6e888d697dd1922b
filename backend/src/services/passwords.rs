//! One-way salted password hashing.

use super::error::{ServiceError, ServiceResult};

/// Work factor bounds accepted by bcrypt.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt hasher with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> ServiceResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
        let hash = hasher.hash("pw1").unwrap();
        assert_ne!(hash, "pw1");
        assert!(hasher.verify("pw1", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!PasswordHasher::default().verify("pw", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), MIN_BCRYPT_COST);
        assert_eq!(PasswordHasher::new(99).cost(), MAX_BCRYPT_COST);
        assert_eq!(PasswordHasher::new(12).cost(), 12);
    }
}
