use crate::artifact::{ProofArtifact, PROOF_BYTES};
use crate::circuits::{ExploitCircuit, LossGadget};
use crate::commitment::commit_opening;
use crate::keys::{KeyError, ProvingKey, VerificationKey};
use crate::types::PublicInputs;
use crate::witness::Opening;
use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalSerialize, SerializationError};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::{debug, info};

/// Why a witness cannot back a proof for the given public inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WitnessRejection {
    #[error("Witness target does not match the program target")]
    TargetMismatch,
    #[error("Opening does not hash to the public commitment")]
    CommitmentMismatch,
    #[error("Loss gadget cannot compute a loss for this witness")]
    LossNotComputable,
    #[error("Loss {loss} is below threshold {threshold}")]
    LossBelowThreshold { loss: u128, threshold: u128 },
    #[error("Constraint system not satisfied")]
    ConstraintsUnsatisfied,
}

/// Errors that can occur during key generation or proof generation
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Invalid witness: {0}")]
    InvalidWitness(#[from] WitnessRejection),
    #[error("Parameter generation failed: {0}")]
    Setup(String),
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Generate the key pair for a loss gadget's circuit
pub fn setup<L, R>(loss: L, rng: &mut R) -> Result<(ProvingKey<L>, VerificationKey), ProofError>
where
    L: LossGadget,
    R: RngCore + CryptoRng,
{
    let circuit = ExploitCircuit::empty(loss.clone());
    let (pk, vk) = Groth16::<Bn254>::setup(circuit, rng)
        .map_err(|e| ProofError::Setup(e.to_string()))?;

    let verification_key = VerificationKey::new(loss.name(), vk)?;
    info!(
        gadget = loss.name(),
        vk_id = %verification_key.id(),
        "Generated proving and verification keys"
    );

    Ok((
        ProvingKey {
            loss,
            key: pk,
            verification_key_id: verification_key.id(),
        },
        verification_key,
    ))
}

/// Run every check the circuit would enforce, natively and then on the
/// synthesized constraint system. Returns the computed loss.
pub fn check_witness<L: LossGadget>(
    loss: &L,
    opening: &Opening,
    public_inputs: &PublicInputs,
) -> Result<u128, ProofError> {
    let witness = &opening.witness;
    if witness.target != public_inputs.target {
        return Err(WitnessRejection::TargetMismatch.into());
    }
    if commit_opening(opening) != public_inputs.commitment {
        return Err(WitnessRejection::CommitmentMismatch.into());
    }

    let value = loss
        .evaluate(&public_inputs.target, witness)
        .ok_or(WitnessRejection::LossNotComputable)?;
    if value < public_inputs.threshold_loss {
        return Err(WitnessRejection::LossBelowThreshold {
            loss: value,
            threshold: public_inputs.threshold_loss,
        }
        .into());
    }

    let cs = ConstraintSystem::<Fr>::new_ref();
    ExploitCircuit::new(loss.clone(), public_inputs, opening)
        .generate_constraints(cs.clone())
        .map_err(|e| ProofError::ProofGeneration(e.to_string()))?;
    let satisfied = cs
        .is_satisfied()
        .map_err(|e| ProofError::ProofGeneration(e.to_string()))?;
    if !satisfied {
        debug!(
            unsatisfied = ?cs.which_is_unsatisfied().ok().flatten(),
            "Witness passed native checks but not the circuit"
        );
        return Err(WitnessRejection::ConstraintsUnsatisfied.into());
    }

    Ok(value)
}

/// Produce a proof artifact for a committed opening
pub fn generate<L: LossGadget>(
    opening: &Opening,
    public_inputs: &PublicInputs,
    proving_key: &ProvingKey<L>,
) -> Result<ProofArtifact, ProofError> {
    let mut rng = rand::thread_rng();
    generate_with_rng(opening, public_inputs, proving_key, &mut rng)
}

/// `generate` with caller-supplied randomness; proofs still differ per call
/// unless the RNG is reseeded
pub fn generate_with_rng<L, R>(
    opening: &Opening,
    public_inputs: &PublicInputs,
    proving_key: &ProvingKey<L>,
    rng: &mut R,
) -> Result<ProofArtifact, ProofError>
where
    L: LossGadget,
    R: RngCore + CryptoRng,
{
    let loss = check_witness(&proving_key.loss, opening, public_inputs)?;
    debug!(
        program = %public_inputs.program_id,
        gadget = proving_key.loss.name(),
        "Witness accepted, proving"
    );

    let circuit = ExploitCircuit::new(proving_key.loss.clone(), public_inputs, opening);
    let proof = Groth16::<Bn254>::prove(&proving_key.key, circuit, rng)
        .map_err(|e| ProofError::ProofGeneration(e.to_string()))?;

    let mut buf = Vec::with_capacity(PROOF_BYTES);
    proof.serialize_compressed(&mut buf)?;
    let mut proof_bytes = [0u8; PROOF_BYTES];
    if buf.len() != PROOF_BYTES {
        return Err(ProofError::ProofGeneration(format!(
            "compressed proof is {} bytes, expected {}",
            buf.len(),
            PROOF_BYTES
        )));
    }
    proof_bytes.copy_from_slice(&buf);

    info!(
        program = %public_inputs.program_id,
        commitment = %public_inputs.commitment,
        threshold = public_inputs.threshold_loss,
        clears_by = loss - public_inputs.threshold_loss,
        "Generated proof artifact"
    );

    Ok(ProofArtifact {
        public_inputs: *public_inputs,
        proof_bytes,
        verification_key_id: proving_key.verification_key_id,
    })
}
