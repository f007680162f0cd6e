//! Reusable R1CS gadgets: range checks, comparison, and the hash-consistency
//! gadget matching `commitment::commit`.

use crate::commitment::poseidon_config;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_ff::{Field, PrimeField};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Fixed bit-width of loss and threshold values; nothing above it is representable
pub const LOSS_BITS: usize = 128;

/// Enforce `value < 2^bits` by bit decomposition.
///
/// The decomposition is over the full field width, so every bit above
/// `bits` is forced to zero.
pub fn enforce_bit_width(value: &FpVar<Fr>, bits: usize) -> Result<(), SynthesisError> {
    assert!(bits < Fr::MODULUS_BIT_SIZE as usize - 1);

    let value_bits = value.to_bits_le()?;
    for bit in value_bits.iter().skip(bits) {
        bit.enforce_equal(&Boolean::constant(false))?;
    }
    Ok(())
}

/// Enforce `a >= b` for operands already known to be below `2^bits`.
///
/// `a - b + 2^bits` lies in `[1, 2^(bits+1))`; its bit `bits` is set exactly
/// when `a >= b`.
pub fn enforce_greater_or_equal(
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    bits: usize,
) -> Result<(), SynthesisError> {
    assert!(bits + 1 < Fr::MODULUS_BIT_SIZE as usize - 1);

    let offset = FpVar::constant(pow2(bits));
    let shifted = a - b + offset;

    let shifted_bits = shifted.to_bits_le()?;
    for bit in shifted_bits.iter().skip(bits + 1) {
        bit.enforce_equal(&Boolean::constant(false))?;
    }
    shifted_bits[bits].enforce_equal(&Boolean::constant(true))?;
    Ok(())
}

/// In-circuit Poseidon sponge, absorbing `inputs` and squeezing one element
pub fn poseidon_hash(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, poseidon_config());
    sponge.absorb(&inputs.to_vec())?;
    let mut digest = sponge.squeeze_field_elements(1)?;
    digest.pop().ok_or(SynthesisError::Unsatisfiable)
}

fn pow2(bits: usize) -> Fr {
    Fr::from(2u64).pow([bits as u64])
}
