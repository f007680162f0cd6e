use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::CanonicalDeserialize;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Size of the fixed public input record inside a proof artifact
pub const PUBLIC_INPUTS_BYTES: usize = 8 + 32 + 16 + 32;

/// Number of field elements the circuit exposes as public inputs
pub const NUM_PUBLIC_INPUTS: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicInputsError {
    #[error("Public inputs must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("Commitment is not a canonical field element")]
    NonCanonicalCommitment,
}

/// Opaque identifier of a bounty program
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// Commitment to the target system's public state (contract address, code digest, ...)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub [u8; 32]);

impl TargetId {
    /// High and low 128-bit limbs, big-endian, so each fits a BN254 scalar
    pub fn limbs(&self) -> (u128, u128) {
        let mut hi = [0u8; 16];
        let mut lo = [0u8; 16];
        hi.copy_from_slice(&self.0[..16]);
        lo.copy_from_slice(&self.0[16..]);
        (u128::from_be_bytes(hi), u128::from_be_bytes(lo))
    }

    pub fn field_limbs(&self) -> (Fr, Fr) {
        let (hi, lo) = self.limbs();
        (Fr::from(hi), Fr::from(lo))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Canonical little-endian encoding of the Poseidon commitment output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentHash([u8; 32]);

impl CommitmentHash {
    pub fn from_field(value: Fr) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&value.into_bigint().to_bytes_le());
        Self(bytes)
    }

    /// Rejects encodings of integers at or above the field modulus
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, PublicInputsError> {
        Fr::deserialize_compressed(&bytes[..])
            .map_err(|_| PublicInputsError::NonCanonicalCommitment)?;
        Ok(Self(bytes))
    }

    pub fn to_field(&self) -> Fr {
        // Canonical by construction
        Fr::from_le_bytes_mod_order(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Public side of the statement, reproducible from the program and the recorded commitment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub program_id: ProgramId,
    pub target: TargetId,
    pub threshold_loss: u128,
    pub commitment: CommitmentHash,
}

impl PublicInputs {
    pub fn new(
        program_id: ProgramId,
        target: TargetId,
        threshold_loss: u128,
        commitment: CommitmentHash,
    ) -> Self {
        Self {
            program_id,
            target,
            threshold_loss,
            commitment,
        }
    }

    /// Field elements in the order the circuit allocates its instance variables
    pub fn to_field_elements(&self) -> Vec<Fr> {
        let (target_hi, target_lo) = self.target.field_limbs();
        vec![
            Fr::from(self.program_id.0),
            target_hi,
            target_lo,
            Fr::from(self.threshold_loss),
            self.commitment.to_field(),
        ]
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_INPUTS_BYTES] {
        let mut buf = [0u8; PUBLIC_INPUTS_BYTES];
        buf[0..8].copy_from_slice(&self.program_id.0.to_le_bytes());
        buf[8..40].copy_from_slice(&self.target.0);
        buf[40..56].copy_from_slice(&self.threshold_loss.to_le_bytes());
        buf[56..88].copy_from_slice(self.commitment.as_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, PublicInputsError> {
        if data.len() != PUBLIC_INPUTS_BYTES {
            return Err(PublicInputsError::Length {
                expected: PUBLIC_INPUTS_BYTES,
                actual: data.len(),
            });
        }

        let mut program_id = [0u8; 8];
        program_id.copy_from_slice(&data[0..8]);
        let mut target = [0u8; 32];
        target.copy_from_slice(&data[8..40]);
        let mut threshold = [0u8; 16];
        threshold.copy_from_slice(&data[40..56]);
        let mut commitment = [0u8; 32];
        commitment.copy_from_slice(&data[56..88]);

        Ok(Self {
            program_id: ProgramId(u64::from_le_bytes(program_id)),
            target: TargetId(target),
            threshold_loss: u128::from_le_bytes(threshold),
            commitment: CommitmentHash::from_bytes(commitment)?,
        })
    }
}
