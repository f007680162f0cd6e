//! Proof artifact wire format.
//!
//! ```text
//! format_version:u8 | curve_id:u8 | public_inputs:88 | proof:128 | verification_key_id:32
//! ```

use crate::keys::{VerificationKeyId, CURVE_BN254, FORMAT_VERSION};
use crate::types::{PublicInputs, PublicInputsError, PUBLIC_INPUTS_BYTES};
use ark_bn254::Bn254;
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, SerializationError};
use std::fmt;
use thiserror::Error;

/// Compressed Groth16 proof over BN254: A (G1) | B (G2) | C (G1)
pub const PROOF_BYTES: usize = 32 + 64 + 32;

pub const ARTIFACT_BYTES: usize = 2 + PUBLIC_INPUTS_BYTES + PROOF_BYTES + 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("Artifact truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("Artifact has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("Unsupported artifact format version {0}")]
    UnsupportedVersion(u8),
    #[error("Unsupported curve id {0}")]
    UnsupportedCurve(u8),
    #[error("Invalid public inputs: {0}")]
    InvalidPublicInputs(#[from] PublicInputsError),
    #[error("Proof points do not decode: {0}")]
    InvalidProof(String),
}

/// What a claimant submits to the escrow
#[derive(Clone, PartialEq, Eq)]
pub struct ProofArtifact {
    pub public_inputs: PublicInputs,
    pub proof_bytes: [u8; PROOF_BYTES],
    pub verification_key_id: VerificationKeyId,
}

impl ProofArtifact {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ARTIFACT_BYTES);
        buf.push(FORMAT_VERSION);
        buf.push(CURVE_BN254);
        buf.extend_from_slice(&self.public_inputs.to_bytes());
        buf.extend_from_slice(&self.proof_bytes);
        buf.extend_from_slice(&self.verification_key_id.0);
        buf
    }

    /// Structural parse only; the proof points are decoded by `decode_proof`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ArtifactError> {
        if data.len() < 2 {
            return Err(ArtifactError::Truncated {
                needed: ARTIFACT_BYTES,
                actual: data.len(),
            });
        }
        if data[0] != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(data[0]));
        }
        if data[1] != CURVE_BN254 {
            return Err(ArtifactError::UnsupportedCurve(data[1]));
        }
        if data.len() < ARTIFACT_BYTES {
            return Err(ArtifactError::Truncated {
                needed: ARTIFACT_BYTES,
                actual: data.len(),
            });
        }
        if data.len() > ARTIFACT_BYTES {
            return Err(ArtifactError::TrailingBytes(data.len() - ARTIFACT_BYTES));
        }

        let inputs_end = 2 + PUBLIC_INPUTS_BYTES;
        let proof_end = inputs_end + PROOF_BYTES;
        let public_inputs = PublicInputs::from_bytes(&data[2..inputs_end])?;
        let mut proof_bytes = [0u8; PROOF_BYTES];
        proof_bytes.copy_from_slice(&data[inputs_end..proof_end]);
        let mut key_id = [0u8; 32];
        key_id.copy_from_slice(&data[proof_end..]);

        Ok(Self {
            public_inputs,
            proof_bytes,
            verification_key_id: VerificationKeyId(key_id),
        })
    }

    /// Decode and subgroup-check the proof points
    pub fn decode_proof(&self) -> Result<Proof<Bn254>, ArtifactError> {
        Proof::<Bn254>::deserialize_compressed(&self.proof_bytes[..])
            .map_err(|e: SerializationError| ArtifactError::InvalidProof(e.to_string()))
    }
}

impl fmt::Debug for ProofArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofArtifact")
            .field("public_inputs", &self.public_inputs)
            .field("verification_key_id", &self.verification_key_id)
            .finish_non_exhaustive()
    }
}
