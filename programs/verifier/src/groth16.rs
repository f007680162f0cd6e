use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof};
use prover::{ArtifactError, ProofArtifact, PublicInputs, VerificationKey, VerificationKeyId};
use thiserror::Error;

/// Why an artifact was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Artifact names key {actual}, expected {expected}")]
    KeyMismatch {
        expected: VerificationKeyId,
        actual: VerificationKeyId,
    },
    #[error("Artifact public inputs differ from the expected statement")]
    PublicInputsMismatch,
    #[error("Verification key expects {expected} public inputs, got {actual}")]
    InvalidPublicInputs { expected: usize, actual: usize },
    #[error("Invalid curve point: {0}")]
    InvalidCurvePoint(#[from] ArtifactError),
    #[error("Pairing check failed: {0}")]
    PairingFailed(String),
}

/// Verification key with the pairing precomputation done once
#[derive(Clone, Debug)]
pub struct PreparedKey {
    id: VerificationKeyId,
    gadget: String,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl PreparedKey {
    pub fn new(vk: &VerificationKey) -> Self {
        Self {
            id: vk.id(),
            gadget: vk.gadget().to_string(),
            pvk: prepare_verifying_key(vk.key()),
        }
    }

    pub fn id(&self) -> VerificationKeyId {
        self.id
    }

    pub fn gadget(&self) -> &str {
        &self.gadget
    }

    /// Number of public inputs the key was generated for
    pub fn public_input_count(&self) -> usize {
        self.pvk.vk.gamma_abc_g1.len().saturating_sub(1)
    }
}

/// Groth16 pairing check for already-decoded proof points.
///
/// `e(A, B) = e(alpha, beta) * e(vk_x, gamma) * e(C, delta)` where
/// `vk_x = IC[0] + sum(IC[i+1] * public_input[i])`.
pub fn verify_groth16_proof(
    proof: &Proof<Bn254>,
    key: &PreparedKey,
    public_inputs: &[Fr],
) -> Result<bool, VerificationError> {
    if public_inputs.len() != key.public_input_count() {
        return Err(VerificationError::InvalidPublicInputs {
            expected: key.public_input_count(),
            actual: public_inputs.len(),
        });
    }

    let vk_x = Groth16::<Bn254>::prepare_inputs(&key.pvk, public_inputs)
        .map_err(|e| VerificationError::PairingFailed(e.to_string()))?;
    Groth16::<Bn254>::verify_proof_with_prepared_inputs(&key.pvk, proof, &vk_x)
        .map_err(|e| VerificationError::PairingFailed(e.to_string()))
}

/// Full artifact check against the statement the escrow expects.
///
/// Structural mismatches are errors; `Ok(false)` means the pairing itself failed.
pub fn check_artifact(
    artifact: &ProofArtifact,
    expected: &PublicInputs,
    key: &PreparedKey,
) -> Result<bool, VerificationError> {
    if artifact.verification_key_id != key.id {
        return Err(VerificationError::KeyMismatch {
            expected: key.id,
            actual: artifact.verification_key_id,
        });
    }
    if artifact.public_inputs != *expected {
        return Err(VerificationError::PublicInputsMismatch);
    }

    let proof = artifact.decode_proof()?;
    verify_groth16_proof(&proof, key, &expected.to_field_elements())
}
