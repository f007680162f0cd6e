//! Commitment to a witness opening.
//!
//! The hash is a Poseidon sponge over BN254 so the exact same function can be
//! re-evaluated inside the circuit (`circuits::gadgets::poseidon_hash`).

use crate::circuits::encoding::EncodedWitness;
use crate::types::{CommitmentHash, TargetId};
use crate::witness::{Blinding, Opening, Witness};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use std::sync::OnceLock;

/// Domain tag absorbed before anything else ("BBP")
pub const COMMITMENT_DOMAIN: u64 = 0x0042_4250;

const POSEIDON_RATE: usize = 2;
const POSEIDON_CAPACITY: usize = 1;
const POSEIDON_FULL_ROUNDS: usize = 8;
const POSEIDON_PARTIAL_ROUNDS: usize = 57;
const POSEIDON_ALPHA: u64 = 5;

/// Poseidon parameters shared by the native hash and the circuit gadget
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );
        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}

/// Sponge input sequence: domain tag, encoded witness, blinding
pub fn commitment_preimage(
    target: &TargetId,
    encoded: &EncodedWitness,
    blinding: &Blinding,
) -> Vec<Fr> {
    let (target_hi, target_lo) = target.field_limbs();
    let mut elements = vec![Fr::from(COMMITMENT_DOMAIN), target_hi, target_lo];
    elements.extend(encoded.hashed_fields());
    elements.push(blinding.to_field());
    elements
}

/// `commitment_hash = Poseidon(DOMAIN, encode(witness), blinding)`
pub fn commit(witness: &Witness, blinding: &Blinding) -> CommitmentHash {
    let encoded = EncodedWitness::from_witness(witness);
    let preimage = commitment_preimage(&witness.target, &encoded, blinding);

    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    sponge.absorb(&preimage);
    let digest = sponge.squeeze_native_field_elements(1);
    CommitmentHash::from_field(digest[0])
}

pub fn commit_opening(opening: &Opening) -> CommitmentHash {
    commit(&opening.witness, &opening.blinding)
}

/// Check a disclosed witness and blinding against a recorded commitment.
///
/// Undecodable plaintext counts as a mismatch: it cannot hash to anything.
pub fn opens_to(commitment: &CommitmentHash, witness_plaintext: &[u8], blinding: &[u8]) -> bool {
    let (Ok(witness), Ok(blinding)) = (
        Witness::from_bytes(witness_plaintext),
        Blinding::from_bytes(blinding),
    ) else {
        return false;
    };
    commit(&witness, &blinding) == *commitment
}
