//! Pluggable loss computation.
//!
//! A `LossGadget` is the only domain-specific part of the statement: it maps
//! a witness to a loss value natively (for prover-side filtering) and inside
//! the constraint system. Both halves must agree on every witness for which
//! `evaluate` returns `Some`.

use crate::circuits::gadgets::enforce_bit_width;
use crate::types::TargetId;
use crate::witness::Witness;
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Shortest trace that still carries a call selector
pub const MIN_SELECTOR_BYTES: usize = 4;

/// Width used to bound `trace_len - MIN_SELECTOR_BYTES`; trace length never exceeds 255
const TRACE_LEN_BITS: usize = 8;

/// Public target limbs as allocated by the circuit
pub struct TargetVars {
    pub hi: FpVar<Fr>,
    pub lo: FpVar<Fr>,
}

/// Private witness variables as allocated by the circuit.
///
/// Balances are already range-checked to `LOSS_BITS` and `trace_len` to
/// `MAX_TRACE_BYTES` when a gadget sees them.
pub struct WitnessVars {
    pub pre_balance: FpVar<Fr>,
    pub post_balance: FpVar<Fr>,
    pub trace_len: FpVar<Fr>,
    pub trace_chunks: Vec<FpVar<Fr>>,
}

pub trait LossGadget: Clone + Send + Sync + 'static {
    /// Stable name, mixed into the verification key id
    fn name(&self) -> &'static str;

    /// Native loss, or `None` when the witness does not describe a loss
    fn evaluate(&self, target: &TargetId, witness: &Witness) -> Option<u128>;

    /// In-circuit loss. The caller range-checks the result to `LOSS_BITS`.
    fn synthesize(
        &self,
        cs: ConstraintSystemRef<Fr>,
        target: &TargetVars,
        witness: &WitnessVars,
    ) -> Result<FpVar<Fr>, SynthesisError>;
}

fn enforce_selector_present(trace_len: &FpVar<Fr>) -> Result<(), SynthesisError> {
    let remainder = trace_len - FpVar::constant(Fr::from(MIN_SELECTOR_BYTES as u64));
    enforce_bit_width(&remainder, TRACE_LEN_BITS)
}

/// Loss is the balance drained from the target: `pre_balance - post_balance`.
///
/// A witness whose post balance exceeds the pre balance has no loss; in the
/// circuit the difference wraps and fails the caller's range check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceDrainLoss;

impl LossGadget for BalanceDrainLoss {
    fn name(&self) -> &'static str {
        "balance-drain"
    }

    fn evaluate(&self, _target: &TargetId, witness: &Witness) -> Option<u128> {
        if witness.trace().len() < MIN_SELECTOR_BYTES {
            return None;
        }
        witness.pre_balance.checked_sub(witness.post_balance)
    }

    fn synthesize(
        &self,
        _cs: ConstraintSystemRef<Fr>,
        _target: &TargetVars,
        witness: &WitnessVars,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        enforce_selector_present(&witness.trace_len)?;
        Ok(&witness.pre_balance - &witness.post_balance)
    }
}

/// Loss is the whole balance the trace can reach, regardless of what remains
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FullBalanceLoss;

impl LossGadget for FullBalanceLoss {
    fn name(&self) -> &'static str {
        "full-balance"
    }

    fn evaluate(&self, _target: &TargetId, witness: &Witness) -> Option<u128> {
        if witness.trace().len() < MIN_SELECTOR_BYTES {
            return None;
        }
        Some(witness.pre_balance)
    }

    fn synthesize(
        &self,
        _cs: ConstraintSystemRef<Fr>,
        _target: &TargetVars,
        witness: &WitnessVars,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        enforce_selector_present(&witness.trace_len)?;
        Ok(witness.pre_balance.clone())
    }
}
