//! Ticket codec: AES-128-EAX authenticated encryption of opaque payloads.
//!
//! ## Wire format
//! ```text
//! [16B nonce][16B tag][N B ciphertext]
//! ```
//! rendered as URL-safe unpadded base64. The tag covers both the nonce and the
//! ciphertext, so altering any byte of the credential fails decryption.
//!
//! Every call to [`encrypt`] draws a fresh nonce from a CSPRNG; nothing here
//! holds state between calls.

use std::fmt;

use aes::Aes128;
use eax::Eax;
use eax::aead::{AeadInPlace, KeyInit};
use serde::{Deserialize, Serialize};

use crate::encoding::{base64_decode, base64_encode};
use crate::error::CodecError;
use crate::keys::PrincipalKey;

pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

/// Smallest valid decoded credential: nonce + tag around an empty ciphertext.
pub const HEADER_LEN: usize = NONCE_LEN + TAG_LEN;

type Aes128Eax = Eax<Aes128>;

/// Parse errors for the binary form — `Copy`, no allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireParseError {
    TooShort(usize),
}

/// Binary form of a credential, split into its three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedTicket {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedTicket {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.tag);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Core parser. Kani harnesses verify it directly.
    fn parse(bytes: &[u8]) -> Result<Self, WireParseError> {
        let too_short = WireParseError::TooShort(bytes.len());
        let (nonce, rest) = bytes.split_first_chunk::<NONCE_LEN>().ok_or(too_short)?;
        let (tag, ciphertext) = rest.split_first_chunk::<TAG_LEN>().ok_or(too_short)?;
        Ok(Self {
            nonce: *nonce,
            tag: *tag,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::parse(bytes).map_err(|e| match e {
            WireParseError::TooShort(n) => {
                CodecError::Decode(format!("{n} bytes, need at least {HEADER_LEN}"))
            }
        })
    }
}

// --- Credential ---

/// Printable wire form of a sealed ticket.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_sealed(sealed: &SealedTicket) -> Self {
        Self(base64_encode(&sealed.to_bytes()))
    }

    /// Decode the printable form. Does not authenticate anything.
    pub fn decode(&self) -> Result<SealedTicket, CodecError> {
        let bytes = base64_decode(&self.0).map_err(|e| CodecError::Decode(e.to_string()))?;
        SealedTicket::from_bytes(&bytes)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.0.get(..12).unwrap_or(self.0.as_str());
        write!(f, "Credential({prefix}..., {} chars)", self.0.len())
    }
}

// --- encrypt / decrypt ---

/// Seal `payload` under `key` with a nonce from the thread-local CSPRNG.
pub fn encrypt(payload: &[u8], key: &PrincipalKey) -> Result<Credential, CodecError> {
    encrypt_with_rng(payload, key, &mut rand::rng())
}

/// Seal `payload` under `key`, drawing the nonce from `rng`.
pub fn encrypt_with_rng<R: rand::CryptoRng + rand::RngCore>(
    payload: &[u8],
    key: &PrincipalKey,
    rng: &mut R,
) -> Result<Credential, CodecError> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = Aes128Eax::new(key.as_bytes().into());
    let mut ciphertext = payload.to_vec();
    let computed = cipher
        .encrypt_in_place_detached((&nonce).into(), b"", &mut ciphertext)
        .map_err(|_| CodecError::Seal)?;

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&computed);

    Ok(Credential::from_sealed(&SealedTicket {
        nonce,
        tag,
        ciphertext,
    }))
}

/// Open a credential sealed under `key`. The plaintext is only returned after
/// the tag verifies.
pub fn decrypt(credential: &Credential, key: &PrincipalKey) -> Result<Vec<u8>, CodecError> {
    let SealedTicket {
        nonce,
        tag,
        mut ciphertext,
    } = credential.decode()?;

    let cipher = Aes128Eax::new(key.as_bytes().into());
    cipher
        .decrypt_in_place_detached((&nonce).into(), b"", &mut ciphertext, (&tag).into())
        .map_err(|_| CodecError::Integrity)?;
    Ok(ciphertext)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;

    use super::*;
    use crate::keys::KEY_LEN;

    fn test_key() -> PrincipalKey {
        PrincipalKey::generate(&mut rand::rng())
    }

    /// Flip one bit of the decoded credential and re-encode it.
    fn flip_bit(credential: &Credential, byte: usize, bit: u8) -> Credential {
        let mut bytes = credential.decode().unwrap().to_bytes();
        bytes[byte] ^= 1 << bit;
        Credential::from_sealed(&SealedTicket::from_bytes(&bytes).unwrap())
    }

    #[test]
    fn roundtrip() {
        let key = test_key();
        let cred = encrypt(b"hello ticket", &key).unwrap();
        assert_eq!(decrypt(&cred, &key).unwrap(), b"hello ticket");
    }

    #[test]
    fn empty_payload_roundtrip() {
        let key = test_key();
        let cred = encrypt(b"", &key).unwrap();
        assert_eq!(cred.decode().unwrap().to_bytes().len(), HEADER_LEN);
        assert!(decrypt(&cred, &key).unwrap().is_empty());
    }

    #[test]
    fn layout_is_nonce_tag_ciphertext() {
        let key = test_key();
        let payload = b"twenty-one bytes long";
        let cred = encrypt(payload, &key).unwrap();
        let sealed = cred.decode().unwrap();
        assert_eq!(sealed.ciphertext.len(), payload.len());
        assert_ne!(sealed.ciphertext.as_slice(), payload.as_slice());
        assert_eq!(sealed.to_bytes().len(), HEADER_LEN + payload.len());
    }

    #[test]
    fn nonce_comes_from_supplied_rng() {
        let key = test_key();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut expected = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rng.clone(), &mut expected);

        let cred = encrypt_with_rng(b"payload", &key, &mut rng).unwrap();
        assert_eq!(cred.decode().unwrap().nonce, expected);
    }

    #[test]
    fn wrong_key_fails_integrity() {
        let k1 = test_key();
        let k2 = test_key();
        let cred = encrypt(b"for k1 only", &k1).unwrap();
        assert_eq!(decrypt(&cred, &k2), Err(CodecError::Integrity));
    }

    #[test]
    fn tampered_regions_fail_integrity() {
        let key = test_key();
        let cred = encrypt(b"do not touch", &key).unwrap();

        // First nonce byte, first tag byte, first and last ciphertext bytes.
        let len = cred.decode().unwrap().to_bytes().len();
        for byte in [0, NONCE_LEN, HEADER_LEN, len - 1] {
            let tampered = flip_bit(&cred, byte, 3);
            assert_eq!(
                decrypt(&tampered, &key),
                Err(CodecError::Integrity),
                "byte {byte} tamper accepted"
            );
        }
    }

    #[test]
    fn truncated_credential_is_decode_error() {
        let key = test_key();
        let short = Credential::from(base64_encode(&[0u8; HEADER_LEN - 1]));
        assert!(matches!(decrypt(&short, &key), Err(CodecError::Decode(_))));

        let empty = Credential::from("");
        assert!(matches!(decrypt(&empty, &key), Err(CodecError::Decode(_))));
    }

    #[test]
    fn non_base64_is_decode_error() {
        let key = test_key();
        let garbage = Credential::from("this is not base64!");
        assert!(matches!(decrypt(&garbage, &key), Err(CodecError::Decode(_))));
    }

    #[test]
    fn header_only_forgery_is_integrity_error() {
        // Long enough to parse, but no key produced it.
        let key = PrincipalKey::from_bytes([9u8; KEY_LEN]);
        let forged = Credential::from(base64_encode(&[0u8; HEADER_LEN]));
        assert_eq!(decrypt(&forged, &key), Err(CodecError::Integrity));
    }

    #[test]
    fn nonces_never_repeat() {
        let key = test_key();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let nonce = encrypt(b"same payload", &key).unwrap().decode().unwrap().nonce;
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }

    #[test]
    fn same_payload_yields_distinct_credentials() {
        let key = test_key();
        let a = encrypt(b"same", &key).unwrap();
        let b = encrypt(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_shows_prefix_only() {
        let key = test_key();
        let cred = encrypt(b"some payload bytes", &key).unwrap();
        let rendered = format!("{cred:?}");
        assert!(rendered.starts_with("Credential("));
        assert!(!rendered.contains(cred.as_str()));
    }

    #[test]
    fn credential_serde_is_plain_string() {
        let key = test_key();
        let cred = encrypt(b"x", &key).unwrap();
        let json = serde_json::to_string(&cred).unwrap();
        assert_eq!(json, format!("\"{}\"", cred.as_str()));
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }
}

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Prove: `parse` never panics on any input up to 40 bytes.
    #[kani::proof]
    #[kani::unwind(41)]
    fn parse_no_panic() {
        let len: usize = kani::any();
        kani::assume(len <= 40);
        let buf: [u8; 40] = kani::any();
        let _ = SealedTicket::parse(&buf[..len]);
    }

    /// Prove: anything shorter than the header is rejected.
    #[kani::proof]
    fn short_input_rejected() {
        let len: usize = kani::any();
        kani::assume(len < HEADER_LEN);
        let buf: [u8; HEADER_LEN] = kani::any();
        assert!(SealedTicket::parse(&buf[..len]).is_err());
    }
}
