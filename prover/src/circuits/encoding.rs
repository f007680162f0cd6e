use crate::witness::{Witness, MAX_TRACE_BYTES};
use ark_bn254::Fr;
use ark_ff::PrimeField;

/// Bytes packed into one trace chunk; 31 bytes always fit below the BN254 modulus
pub const TRACE_CHUNK_BYTES: usize = 31;

/// Number of chunks covering `MAX_TRACE_BYTES`
pub const TRACE_CHUNKS: usize = (MAX_TRACE_BYTES + TRACE_CHUNK_BYTES - 1) / TRACE_CHUNK_BYTES;

/// Witness mapped into circuit-compatible field elements.
///
/// The target is not repeated here: the circuit uses the public target limbs,
/// which ties the committed witness to the program's target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedWitness {
    pub pre_balance: Fr,
    pub post_balance: Fr,
    pub trace_len: Fr,
    pub trace_chunks: [Fr; TRACE_CHUNKS],
}

impl EncodedWitness {
    pub fn from_witness(witness: &Witness) -> Self {
        let trace = witness.trace();
        let mut trace_chunks = [Fr::from(0u64); TRACE_CHUNKS];
        for (chunk, bytes) in trace_chunks.iter_mut().zip(trace.chunks(TRACE_CHUNK_BYTES)) {
            *chunk = Fr::from_le_bytes_mod_order(bytes);
        }

        Self {
            pre_balance: Fr::from(witness.pre_balance),
            post_balance: Fr::from(witness.post_balance),
            trace_len: Fr::from(trace.len() as u64),
            trace_chunks,
        }
    }

    /// Elements absorbed by the commitment sponge after the target limbs
    pub fn hashed_fields(&self) -> Vec<Fr> {
        let mut fields = vec![self.pre_balance, self.post_balance, self.trace_len];
        fields.extend_from_slice(&self.trace_chunks);
        fields
    }
}
