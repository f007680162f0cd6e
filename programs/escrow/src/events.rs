use crate::state::{AccountId, ClaimId, Timestamp};
use prover::{ProgramId, PublicInputs, TargetId, VerificationKeyId};
use serde::{Deserialize, Serialize};

/// Why a submitted proof was turned away; the claim may retry before its deadline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    MalformedArtifact,
    PublicInputsMismatch,
    ProofInvalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashReason {
    RevealMissing,
    RevealMismatch,
}

/// One event per transition. Claim events carry the public statement, never
/// witness content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    ProgramCreated {
        program_id: ProgramId,
        owner: AccountId,
        target: TargetId,
        threshold_loss: u128,
        funds: u128,
        verification_key_id: VerificationKeyId,
    },
    CommitmentRecorded {
        claim_id: ClaimId,
        claimant: AccountId,
        public_inputs: PublicInputs,
        bond: u128,
        claim_deadline: Timestamp,
    },
    ProofRejected {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        reason: RejectionReason,
    },
    ProofVerified {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
    },
    ClaimSuperseded {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        winner: ClaimId,
        bond_refunded: u128,
    },
    Paid {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        claimant: AccountId,
        amount: u128,
        reveal_deadline: Timestamp,
    },
    Revealed {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        matched: bool,
    },
    Slashed {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        reason: SlashReason,
        bond_forfeited: u128,
    },
    ClaimExpired {
        claim_id: ClaimId,
        public_inputs: PublicInputs,
        bond_refunded: u128,
    },
    ProgramExpired {
        program_id: ProgramId,
        refunded: u128,
    },
    Cancelled {
        program_id: ProgramId,
        refunded: u128,
    },
}

/// Event with its position in the escrow log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub at: Timestamp,
    pub event: EscrowEvent,
}
