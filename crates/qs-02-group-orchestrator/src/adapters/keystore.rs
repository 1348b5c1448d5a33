//! Local Keystore Adapter
//!
//! Implements `AccountSigner` with Ed25519 keys held in memory. An account
//! address is the raw verifying key, so the ledger can check a signature from
//! the sender address alone.

use crate::domain::{signing_bytes, Identity, OperationSignature, SignerError};
use crate::ports::AccountSigner;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use qs_01_staking_protocol::Operation;
use shared_types::Address;
use std::collections::BTreeMap;
use tracing::debug;

/// In-memory Ed25519 key store.
#[derive(Default)]
pub struct LocalKeystore {
    keys: RwLock<BTreeMap<Identity, SigningKey>>,
}

impl LocalKeystore {
    /// Empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a random key for `identity`, replacing any existing one.
    pub fn generate(&self, identity: Identity) -> Address {
        let key = SigningKey::generate(&mut rand::thread_rng());
        self.insert(identity, key)
    }

    /// Store the key derived from `seed`.
    pub fn insert_seed(&self, identity: Identity, seed: [u8; 32]) -> Address {
        self.insert(identity, SigningKey::from_bytes(&seed))
    }

    /// Seed of `identity`, for persistence.
    pub fn seed_of(&self, identity: &Identity) -> Option<[u8; 32]> {
        self.keys.read().get(identity).map(SigningKey::to_bytes)
    }

    /// Identities with their addresses.
    pub fn accounts(&self) -> Vec<(Identity, Address)> {
        self.keys
            .read()
            .iter()
            .map(|(identity, key)| (identity.clone(), address_of_key(key)))
            .collect()
    }

    fn insert(&self, identity: Identity, key: SigningKey) -> Address {
        let address = address_of_key(&key);
        debug!(%identity, address = %address.short(), "[qs-02] Key stored");
        self.keys.write().insert(identity, key);
        address
    }
}

fn address_of_key(key: &SigningKey) -> Address {
    Address(key.verifying_key().to_bytes())
}

impl AccountSigner for LocalKeystore {
    fn address_of(&self, identity: &Identity) -> Result<Address, SignerError> {
        self.keys
            .read()
            .get(identity)
            .map(address_of_key)
            .ok_or_else(|| SignerError::UnknownIdentity(identity.to_string()))
    }

    fn sign(
        &self,
        identity: &Identity,
        operation: &Operation,
    ) -> Result<OperationSignature, SignerError> {
        let message =
            signing_bytes(operation).map_err(|e| SignerError::Encoding(e.to_string()))?;
        let keys = self.keys.read();
        let key = keys
            .get(identity)
            .ok_or_else(|| SignerError::UnknownIdentity(identity.to_string()))?;
        Ok(OperationSignature {
            bytes: key.sign(&message).to_bytes(),
        })
    }
}

/// Check an account signature against the operation's sender.
pub fn verify_account_signature(operation: &Operation, signature: &OperationSignature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(operation.sender.as_bytes()) else {
        return false;
    };
    let Ok(message) = signing_bytes(operation) else {
        return false;
    };
    verifying_key
        .verify(&message, &Signature::from_bytes(&signature.bytes))
        .is_ok()
}
