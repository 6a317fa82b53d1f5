//! Principal identities, symmetric principal keys, and the key store seam.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Principal key length in bytes (AES-128).
pub const KEY_LEN: usize = 16;

// --- PrincipalId ---

/// Identity of a client or service. Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// --- PrincipalKey ---

/// Raw symmetric key of one principal. Zeroed on drop; never printed;
/// compared in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrincipalKey([u8; KEY_LEN]);

impl PrincipalKey {
    pub fn generate<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl ConstantTimeEq for PrincipalKey {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl PartialEq for PrincipalKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for PrincipalKey {}

impl fmt::Debug for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrincipalKey(<redacted>)")
    }
}

// --- KeyStore ---

/// Source of principal keys for the issuer. Read-only once handed over.
pub trait KeyStore {
    fn lookup(&self, principal: &PrincipalId) -> Option<&PrincipalKey>;
}

/// `HashMap`-backed key store, populated before the issuer takes ownership.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    keys: HashMap<PrincipalId, PrincipalKey>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key, returning the key it replaced.
    pub fn insert(&mut self, principal: PrincipalId, key: PrincipalKey) -> Option<PrincipalKey> {
        self.keys.insert(principal, key)
    }

    /// Generate and register a fresh key for `principal`, returning a copy
    /// for the principal itself to hold.
    pub fn generate_for<R: rand::CryptoRng + rand::RngCore>(
        &mut self,
        principal: PrincipalId,
        rng: &mut R,
    ) -> PrincipalKey {
        let key = PrincipalKey::generate(rng);
        self.keys.insert(principal, key.clone());
        key
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn lookup(&self, principal: &PrincipalId) -> Option<&PrincipalKey> {
        self.keys.get(principal)
    }
}

impl FromIterator<(PrincipalId, PrincipalKey)> for InMemoryKeyStore {
    fn from_iter<I: IntoIterator<Item = (PrincipalId, PrincipalKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        let mut rng = rand::rng();
        let k1 = PrincipalKey::generate(&mut rng);
        let k2 = PrincipalKey::generate(&mut rng);
        assert_ne!(k1, k2);
    }

    #[test]
    fn equality_is_bytewise() {
        let a = PrincipalKey::from_bytes([7; KEY_LEN]);
        let mut last_differs = [7; KEY_LEN];
        last_differs[KEY_LEN - 1] = 8;
        assert_eq!(a, PrincipalKey::from_bytes([7; KEY_LEN]));
        assert!(bool::from(a.ct_eq(&PrincipalKey::from_bytes([7; KEY_LEN]))));
        assert_ne!(a, PrincipalKey::from_bytes(last_differs));
        assert!(!bool::from(a.ct_eq(&PrincipalKey::from_bytes(last_differs))));
    }

    #[test]
    fn debug_never_shows_key_bytes() {
        let key = PrincipalKey::from_bytes([0xab; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "PrincipalKey(<redacted>)");
    }

    #[test]
    fn store_lookup() {
        let mut rng = rand::rng();
        let mut store = InMemoryKeyStore::new();
        let alice = store.generate_for(PrincipalId::from("Alice"), &mut rng);
        let server = store.generate_for(PrincipalId::from("FileServer"), &mut rng);

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(&"Alice".into()), Some(&alice));
        assert_eq!(store.lookup(&"FileServer".into()), Some(&server));
        assert!(store.lookup(&"Bob".into()).is_none());
    }

    #[test]
    fn lookup_is_exact_match() {
        let store: InMemoryKeyStore = [(
            PrincipalId::from("Alice"),
            PrincipalKey::from_bytes([1; KEY_LEN]),
        )]
        .into_iter()
        .collect();

        assert!(store.lookup(&"Alice2".into()).is_none());
        assert!(store.lookup(&"alice".into()).is_none());
        assert!(store.lookup(&"Alic".into()).is_none());
    }

    #[test]
    fn insert_replaces() {
        let mut store = InMemoryKeyStore::new();
        let id = PrincipalId::from("Alice");
        assert!(store.insert(id.clone(), PrincipalKey::from_bytes([1; KEY_LEN])).is_none());
        let old = store.insert(id.clone(), PrincipalKey::from_bytes([2; KEY_LEN]));
        assert_eq!(old, Some(PrincipalKey::from_bytes([1; KEY_LEN])));
        assert_eq!(store.lookup(&id), Some(&PrincipalKey::from_bytes([2; KEY_LEN])));
    }

    #[test]
    fn principal_id_serde_is_plain_string() {
        let id = PrincipalId::from("FileServer");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"FileServer\"");
    }
}
