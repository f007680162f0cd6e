// Exploit bounty prover library
// Statement definition, commitment scheme, Groth16 (BN254) proof generation
// and the artifact/key wire formats shared with the verifier and escrow

pub mod artifact;
pub mod circuits;
pub mod commitment;
pub mod keys;
pub mod proof_generator;
pub mod types;
pub mod witness;

pub use artifact::{ArtifactError, ProofArtifact, ARTIFACT_BYTES, PROOF_BYTES};
pub use circuits::{BalanceDrainLoss, ExploitCircuit, FullBalanceLoss, LossGadget};
pub use commitment::{commit, commit_opening, opens_to};
pub use keys::{KeyError, ProvingKey, VerificationKey, VerificationKeyId};
pub use proof_generator::{check_witness, generate, generate_with_rng, setup, ProofError, WitnessRejection};
pub use types::{CommitmentHash, ProgramId, PublicInputs, TargetId};
pub use witness::{Blinding, Opening, Witness, WitnessError};

// Re-export core types for convenience
pub use ark_bn254::{Bn254, Fr};
