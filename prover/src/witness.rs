use crate::types::TargetId;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, UniformRand};
use ark_serialize::CanonicalDeserialize;
use ark_std::rand::Rng;
use std::fmt;
use thiserror::Error;

/// Longest exploit trace (calldata) a witness may carry
pub const MAX_TRACE_BYTES: usize = 128;

/// Fixed header of the plaintext witness layout: target | pre | post | trace_len
pub const WITNESS_HEADER_BYTES: usize = 32 + 16 + 16 + 4;

/// Errors that can occur while building or decoding a witness
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WitnessError {
    #[error("Trace too long: {len} bytes exceeds maximum {max}")]
    TraceTooLong { len: usize, max: usize },
    #[error("Witness truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("Witness has {0} trailing bytes after the trace")]
    TrailingBytes(usize),
    #[error("Blinding must be 32 bytes, got {0}")]
    BlindingLength(usize),
    #[error("Blinding is not a canonical field element")]
    NonCanonicalBlinding,
}

/// Private exploit trace plus the balances needed to compute loss.
///
/// Never leaves the claimant's environment until the post-payout reveal.
#[derive(Clone, PartialEq, Eq)]
pub struct Witness {
    pub target: TargetId,
    pub pre_balance: u128,
    pub post_balance: u128,
    trace: Vec<u8>,
}

impl Witness {
    pub fn new(
        target: TargetId,
        pre_balance: u128,
        post_balance: u128,
        trace: Vec<u8>,
    ) -> Result<Self, WitnessError> {
        if trace.len() > MAX_TRACE_BYTES {
            return Err(WitnessError::TraceTooLong {
                len: trace.len(),
                max: MAX_TRACE_BYTES,
            });
        }

        Ok(Self {
            target,
            pre_balance,
            post_balance,
            trace,
        })
    }

    pub fn trace(&self) -> &[u8] {
        &self.trace
    }

    /// Plaintext layout disclosed in a reveal.
    ///
    /// `target(32) | pre_balance(16, BE) | post_balance(16, BE) | trace_len(4, BE) | trace`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(WITNESS_HEADER_BYTES + self.trace.len());
        buf.extend_from_slice(&self.target.0);
        buf.extend_from_slice(&self.pre_balance.to_be_bytes());
        buf.extend_from_slice(&self.post_balance.to_be_bytes());
        buf.extend_from_slice(&(self.trace.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.trace);
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, WitnessError> {
        if data.len() < WITNESS_HEADER_BYTES {
            return Err(WitnessError::Truncated {
                needed: WITNESS_HEADER_BYTES,
                actual: data.len(),
            });
        }

        let mut target = [0u8; 32];
        target.copy_from_slice(&data[0..32]);
        let mut pre = [0u8; 16];
        pre.copy_from_slice(&data[32..48]);
        let mut post = [0u8; 16];
        post.copy_from_slice(&data[48..64]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&data[64..68]);
        let trace_len = u32::from_be_bytes(len) as usize;

        if trace_len > MAX_TRACE_BYTES {
            return Err(WitnessError::TraceTooLong {
                len: trace_len,
                max: MAX_TRACE_BYTES,
            });
        }

        let body = &data[WITNESS_HEADER_BYTES..];
        if body.len() < trace_len {
            return Err(WitnessError::Truncated {
                needed: WITNESS_HEADER_BYTES + trace_len,
                actual: data.len(),
            });
        }
        if body.len() > trace_len {
            return Err(WitnessError::TrailingBytes(body.len() - trace_len));
        }

        Self::new(
            TargetId(target),
            u128::from_be_bytes(pre),
            u128::from_be_bytes(post),
            body.to_vec(),
        )
    }
}

// Keep balances and trace out of logs
impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("target", &self.target)
            .field("trace_len", &self.trace.len())
            .finish_non_exhaustive()
    }
}

/// Claimant-chosen random scalar hiding the witness inside the commitment
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Blinding(Fr);

impl Blinding {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(Fr::rand(rng))
    }

    pub fn from_field(value: Fr) -> Self {
        Self(value)
    }

    pub fn to_field(&self) -> Fr {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.0.into_bigint().to_bytes_le());
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, WitnessError> {
        if data.len() != 32 {
            return Err(WitnessError::BlindingLength(data.len()));
        }
        let value =
            Fr::deserialize_compressed(data).map_err(|_| WitnessError::NonCanonicalBlinding)?;
        Ok(Self(value))
    }
}

impl fmt::Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Blinding(..)")
    }
}

/// Opening of a commitment: the prover's private input and, after payout, the reveal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening {
    pub witness: Witness,
    pub blinding: Blinding,
}

impl Opening {
    pub fn new(witness: Witness, blinding: Blinding) -> Self {
        Self { witness, blinding }
    }
}
