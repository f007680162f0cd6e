//! Groth16 key material and the verification key record format.

use crate::circuits::LossGadget;
use ark_bn254::Bn254;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Version byte shared by the proof artifact and the key record
pub const FORMAT_VERSION: u8 = 1;

/// Curve tag for BN254
pub const CURVE_BN254: u8 = 1;

const KEY_ID_DOMAIN: &[u8] = b"bounty-vk/v1";
const RECORD_HEADER_BYTES: usize = 1 + 1 + 4;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Unsupported key format version {0}")]
    UnsupportedVersion(u8),
    #[error("Unsupported curve id {0}")]
    UnsupportedCurve(u8),
    #[error("Key record truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("Key record has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// Content address of a verification key: `SHA-256("bounty-vk/v1" | gadget | vk)`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerificationKeyId(pub [u8; 32]);

impl VerificationKeyId {
    pub fn derive(gadget: &str, vk_bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_ID_DOMAIN);
        hasher.update(gadget.as_bytes());
        hasher.update(vk_bytes);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for VerificationKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for VerificationKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKeyId({})", &hex::encode(self.0)[..16])
    }
}

/// Verification key published with a bounty program
#[derive(Clone, Debug)]
pub struct VerificationKey {
    id: VerificationKeyId,
    gadget: String,
    key: ark_groth16::VerifyingKey<Bn254>,
}

impl VerificationKey {
    pub fn new(gadget: &str, key: ark_groth16::VerifyingKey<Bn254>) -> Result<Self, KeyError> {
        let mut vk_bytes = Vec::new();
        key.serialize_compressed(&mut vk_bytes)?;
        Ok(Self {
            id: VerificationKeyId::derive(gadget, &vk_bytes),
            gadget: gadget.to_string(),
            key,
        })
    }

    pub fn id(&self) -> VerificationKeyId {
        self.id
    }

    pub fn gadget(&self) -> &str {
        &self.gadget
    }

    pub fn key(&self) -> &ark_groth16::VerifyingKey<Bn254> {
        &self.key
    }

    /// `format_version | curve_id | len (u32 LE) | compressed vk`
    pub fn to_record(&self) -> Result<Vec<u8>, KeyError> {
        let mut vk_bytes = Vec::new();
        self.key.serialize_compressed(&mut vk_bytes)?;

        let mut buf = Vec::with_capacity(RECORD_HEADER_BYTES + vk_bytes.len());
        buf.push(FORMAT_VERSION);
        buf.push(CURVE_BN254);
        buf.extend_from_slice(&(vk_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&vk_bytes);
        Ok(buf)
    }

    /// Parse a key record. The gadget name is not part of the record but of the id.
    pub fn from_record(gadget: &str, data: &[u8]) -> Result<Self, KeyError> {
        if data.len() < RECORD_HEADER_BYTES {
            return Err(KeyError::Truncated {
                needed: RECORD_HEADER_BYTES,
                actual: data.len(),
            });
        }
        if data[0] != FORMAT_VERSION {
            return Err(KeyError::UnsupportedVersion(data[0]));
        }
        if data[1] != CURVE_BN254 {
            return Err(KeyError::UnsupportedCurve(data[1]));
        }

        let mut len = [0u8; 4];
        len.copy_from_slice(&data[2..6]);
        let len = u32::from_le_bytes(len) as usize;
        let body = &data[RECORD_HEADER_BYTES..];
        if body.len() < len {
            return Err(KeyError::Truncated {
                needed: RECORD_HEADER_BYTES + len,
                actual: data.len(),
            });
        }
        if body.len() > len {
            return Err(KeyError::TrailingBytes(body.len() - len));
        }

        let key = ark_groth16::VerifyingKey::<Bn254>::deserialize_compressed(body)?;
        Self::new(gadget, key)
    }
}

/// Proving key bound to the loss gadget it was generated for
#[derive(Clone)]
pub struct ProvingKey<L: LossGadget> {
    pub(crate) loss: L,
    pub(crate) key: ark_groth16::ProvingKey<Bn254>,
    pub(crate) verification_key_id: VerificationKeyId,
}

impl<L: LossGadget> ProvingKey<L> {
    pub fn loss(&self) -> &L {
        &self.loss
    }

    pub fn verification_key_id(&self) -> VerificationKeyId {
        self.verification_key_id
    }
}

impl<L: LossGadget> fmt::Debug for ProvingKey<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvingKey")
            .field("gadget", &self.loss.name())
            .field("verification_key_id", &self.verification_key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_depends_on_gadget_name() {
        let a = VerificationKeyId::derive("balance-drain", b"vk");
        let b = VerificationKeyId::derive("full-balance", b"vk");
        assert_ne!(a, b);
        assert_eq!(a, VerificationKeyId::derive("balance-drain", b"vk"));
    }

    #[test]
    fn test_record_header_errors() {
        assert!(matches!(
            VerificationKey::from_record("g", &[1, 1]),
            Err(KeyError::Truncated { needed: 6, actual: 2 })
        ));
        assert!(matches!(
            VerificationKey::from_record("g", &[2, 1, 0, 0, 0, 0]),
            Err(KeyError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            VerificationKey::from_record("g", &[1, 9, 0, 0, 0, 0]),
            Err(KeyError::UnsupportedCurve(9))
        ));
        assert!(matches!(
            VerificationKey::from_record("g", &[1, 1, 10, 0, 0, 0, 1, 2]),
            Err(KeyError::Truncated { .. })
        ));
    }
}
