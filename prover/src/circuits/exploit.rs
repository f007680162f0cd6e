use crate::circuits::encoding::{EncodedWitness, TRACE_CHUNKS, TRACE_CHUNK_BYTES};
use crate::circuits::gadgets::{
    enforce_bit_width, enforce_greater_or_equal, poseidon_hash, LOSS_BITS,
};
use crate::circuits::loss::{LossGadget, TargetVars, WitnessVars};
use crate::commitment::COMMITMENT_DOMAIN;
use crate::types::PublicInputs;
use crate::witness::{Opening, MAX_TRACE_BYTES};
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

const PROGRAM_ID_BITS: usize = 64;
const TARGET_LIMB_BITS: usize = 128;
const TRACE_LEN_BITS: usize = 8;

/// The exploit relation.
///
/// Public: `[program_id, target_hi, target_lo, threshold_loss, commitment]`.
/// Private: the encoded witness and the blinding.
///
/// Proves knowledge of a witness and blinding such that
/// 1. `Poseidon(DOMAIN, target, encode(witness), blinding) == commitment`,
/// 2. the loss gadget maps the witness to `loss`,
/// 3. `loss >= threshold_loss`, with every quantity bounded to `LOSS_BITS`.
#[derive(Clone)]
pub struct ExploitCircuit<L: LossGadget> {
    loss: L,
    public_inputs: Option<Vec<Fr>>,
    witness: Option<EncodedWitness>,
    blinding: Option<Fr>,
}

impl<L: LossGadget> ExploitCircuit<L> {
    pub fn new(loss: L, public_inputs: &PublicInputs, opening: &Opening) -> Self {
        Self {
            loss,
            public_inputs: Some(public_inputs.to_field_elements()),
            witness: Some(EncodedWitness::from_witness(&opening.witness)),
            blinding: Some(opening.blinding.to_field()),
        }
    }

    /// Shape-only instance for key generation
    pub fn empty(loss: L) -> Self {
        Self {
            loss,
            public_inputs: None,
            witness: None,
            blinding: None,
        }
    }

    fn public_input(&self, index: usize) -> Result<Fr, SynthesisError> {
        self.public_inputs
            .as_ref()
            .and_then(|inputs| inputs.get(index).copied())
            .ok_or(SynthesisError::AssignmentMissing)
    }

    fn private<T>(&self, f: impl Fn(&EncodedWitness) -> T) -> Result<T, SynthesisError> {
        self.witness
            .as_ref()
            .map(f)
            .ok_or(SynthesisError::AssignmentMissing)
    }
}

impl<L: LossGadget> ConstraintSynthesizer<Fr> for ExploitCircuit<L> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Instance variables, in `PublicInputs::to_field_elements` order
        let program_id = FpVar::new_input(cs.clone(), || self.public_input(0))?;
        let target_hi = FpVar::new_input(cs.clone(), || self.public_input(1))?;
        let target_lo = FpVar::new_input(cs.clone(), || self.public_input(2))?;
        let threshold = FpVar::new_input(cs.clone(), || self.public_input(3))?;
        let commitment = FpVar::new_input(cs.clone(), || self.public_input(4))?;

        let pre_balance = FpVar::new_witness(cs.clone(), || self.private(|w| w.pre_balance))?;
        let post_balance = FpVar::new_witness(cs.clone(), || self.private(|w| w.post_balance))?;
        let trace_len = FpVar::new_witness(cs.clone(), || self.private(|w| w.trace_len))?;
        let mut trace_chunks = Vec::with_capacity(TRACE_CHUNKS);
        for i in 0..TRACE_CHUNKS {
            trace_chunks.push(FpVar::new_witness(cs.clone(), || {
                self.private(|w| w.trace_chunks[i])
            })?);
        }
        let blinding = FpVar::new_witness(cs.clone(), || {
            self.blinding.ok_or(SynthesisError::AssignmentMissing)
        })?;

        enforce_bit_width(&program_id, PROGRAM_ID_BITS)?;
        enforce_bit_width(&target_hi, TARGET_LIMB_BITS)?;
        enforce_bit_width(&target_lo, TARGET_LIMB_BITS)?;
        enforce_bit_width(&threshold, LOSS_BITS)?;
        enforce_bit_width(&pre_balance, LOSS_BITS)?;
        enforce_bit_width(&post_balance, LOSS_BITS)?;

        // 0 <= trace_len <= MAX_TRACE_BYTES
        let max_trace = FpVar::constant(Fr::from(MAX_TRACE_BYTES as u64));
        enforce_bit_width(&trace_len, TRACE_LEN_BITS)?;
        enforce_bit_width(&(max_trace - &trace_len), TRACE_LEN_BITS)?;
        for chunk in &trace_chunks {
            enforce_bit_width(chunk, TRACE_CHUNK_BYTES * 8)?;
        }

        let target = TargetVars {
            hi: target_hi,
            lo: target_lo,
        };
        let witness = WitnessVars {
            pre_balance,
            post_balance,
            trace_len,
            trace_chunks,
        };

        let loss = self.loss.synthesize(cs.clone(), &target, &witness)?;
        enforce_bit_width(&loss, LOSS_BITS)?;
        enforce_greater_or_equal(&loss, &threshold, LOSS_BITS)?;

        let mut preimage = vec![
            FpVar::constant(Fr::from(COMMITMENT_DOMAIN)),
            target.hi,
            target.lo,
            witness.pre_balance,
            witness.post_balance,
            witness.trace_len,
        ];
        preimage.extend(witness.trace_chunks);
        preimage.push(blinding);

        let digest = poseidon_hash(cs, &preimage)?;
        digest.enforce_equal(&commitment)?;

        Ok(())
    }
}
