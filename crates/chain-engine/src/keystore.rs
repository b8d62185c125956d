//! In-memory keystore
//!
//! Accounts are ed25519 keypairs. The address is blake3 of the public key. Passwords are never
//! stored, only a blake3 digest bound to the address.

use crate::error::KeystoreError;
use dashmap::DashMap;
use ed25519_dalek::{Signer, SigningKey};
use sealer_types::{AccountManager, Address, Clock, Hash};
use std::sync::Arc;

struct KeystoreEntry {
    signing_key: SigningKey,
    password_digest: Hash,
    /// Unix millis until which the account may sign
    unlocked_until: Option<u64>,
}

/// Thread-safe in-memory keystore
pub struct InMemoryKeystore {
    accounts: DashMap<Address, KeystoreEntry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKeystore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: DashMap::new(),
            clock,
        }
    }

    /// Whether `address` is currently unlocked
    pub fn is_unlocked(&self, address: &Address) -> bool {
        let now = self.clock.now_millis();
        self.accounts
            .get(address)
            .and_then(|entry| entry.unlocked_until)
            .is_some_and(|until| now < until)
    }

    /// ed25519 public key of `address`
    pub fn public_key(&self, address: &Address) -> Option<[u8; 32]> {
        self.accounts
            .get(address)
            .map(|entry| entry.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message` with an unlocked account
    pub fn sign(&self, address: &Address, message: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let entry = self
            .accounts
            .get(address)
            .ok_or(KeystoreError::UnknownAccount(*address))?;
        let now = self.clock.now_millis();
        if !entry.unlocked_until.is_some_and(|until| now < until) {
            return Err(KeystoreError::Locked(*address));
        }
        Ok(entry.signing_key.sign(message).to_bytes().to_vec())
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn password_digest(address: &Address, password: &str) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(address.as_bytes());
        hasher.update(password.as_bytes());
        *hasher.finalize().as_bytes()
    }

    fn check_password(&self, address: &Address, password: &str) -> bool {
        let digest = Self::password_digest(address, password);
        self.accounts
            .get(address)
            .is_some_and(|entry| entry.password_digest == digest)
    }
}

impl AccountManager for InMemoryKeystore {
    fn unlock_account(&self, address: &Address, password: &str, timeout_secs: u64) -> bool {
        if !self.check_password(address, password) {
            tracing::debug!("Failed to unlock account {}", address);
            return false;
        }
        let until = self
            .clock
            .now_millis()
            .saturating_add(timeout_secs.saturating_mul(1000));
        match self.accounts.get_mut(address) {
            Some(mut entry) => {
                entry.unlocked_until = Some(until);
                tracing::info!("Unlocked account {} for {}s", address, timeout_secs);
                true
            }
            None => false,
        }
    }

    fn lock_account(&self, address: &Address, password: &str) -> bool {
        if !self.check_password(address, password) {
            return false;
        }
        match self.accounts.get_mut(address) {
            Some(mut entry) => {
                entry.unlocked_until = None;
                true
            }
            None => false,
        }
    }

    fn create_account(&self, password: &str) -> Option<Address> {
        let secret: [u8; 32] = rand::random();
        let signing_key = SigningKey::from_bytes(&secret);
        let address = Address(*blake3::hash(signing_key.verifying_key().as_bytes()).as_bytes());

        self.accounts.insert(
            address,
            KeystoreEntry {
                signing_key,
                password_digest: Self::password_digest(&address, password),
                unlocked_until: None,
            },
        );
        tracing::info!("Created account {}", address);
        Some(address)
    }

    fn accounts(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.accounts.iter().map(|r| *r.key()).collect();
        addresses.sort();
        addresses
    }

    fn address_exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use sealer_types::ManualClock;
    use std::time::Duration;

    fn keystore() -> (InMemoryKeystore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (InMemoryKeystore::new(clock.clone()), clock)
    }

    #[test]
    fn test_create_and_list_accounts() {
        let (keystore, _) = keystore();
        let a = keystore.create_account("a").unwrap();
        let b = keystore.create_account("b").unwrap();

        assert_ne!(a, b);
        assert!(keystore.address_exists(&a));
        assert!(!keystore.address_exists(&Address([1u8; 32])));

        let accounts = keystore.accounts();
        assert_eq!(accounts.len(), 2);
        assert!(accounts.contains(&a) && accounts.contains(&b));
    }

    #[test]
    fn test_unlock_requires_password() {
        let (keystore, _) = keystore();
        let address = keystore.create_account("secret").unwrap();

        assert!(!keystore.unlock_account(&address, "wrong", 60));
        assert!(!keystore.is_unlocked(&address));

        assert!(keystore.unlock_account(&address, "secret", 60));
        assert!(keystore.is_unlocked(&address));
    }

    #[test]
    fn test_unlock_expires() {
        let (keystore, clock) = keystore();
        let address = keystore.create_account("secret").unwrap();

        assert!(keystore.unlock_account(&address, "secret", 10));
        clock.advance(Duration::from_secs(9));
        assert!(keystore.is_unlocked(&address));

        clock.advance(Duration::from_secs(1));
        assert!(!keystore.is_unlocked(&address));
        assert_eq!(
            keystore.sign(&address, b"msg"),
            Err(KeystoreError::Locked(address))
        );
    }

    #[test]
    fn test_lock_account() {
        let (keystore, _) = keystore();
        let address = keystore.create_account("secret").unwrap();
        keystore.unlock_account(&address, "secret", 60);

        assert!(!keystore.lock_account(&address, "wrong"));
        assert!(keystore.is_unlocked(&address));

        assert!(keystore.lock_account(&address, "secret"));
        assert!(!keystore.is_unlocked(&address));
    }

    #[test]
    fn test_sign_with_unlocked_account() {
        let (keystore, _) = keystore();
        let address = keystore.create_account("secret").unwrap();
        keystore.unlock_account(&address, "secret", 60);

        let signature = keystore.sign(&address, b"mine hash").unwrap();
        let public_key = VerifyingKey::from_bytes(&keystore.public_key(&address).unwrap()).unwrap();
        let signature = Signature::from_slice(&signature).unwrap();
        assert!(public_key.verify(b"mine hash", &signature).is_ok());
    }

    #[test]
    fn test_sign_unknown_account() {
        let (keystore, _) = keystore();
        let unknown = Address([3u8; 32]);
        assert_eq!(
            keystore.sign(&unknown, b"msg"),
            Err(KeystoreError::UnknownAccount(unknown))
        );
    }
}
