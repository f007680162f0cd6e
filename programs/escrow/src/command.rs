use crate::events::RejectionReason;
use crate::state::{AccountId, ClaimId, ProgramTerms};
use prover::{CommitmentHash, ProgramId};

/// Inputs to `Escrow::apply`, one per ledger transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    CreateProgram {
        owner: AccountId,
        terms: ProgramTerms,
        funds: u128,
    },
    SubmitCommitment {
        claimant: AccountId,
        program_id: ProgramId,
        commitment: CommitmentHash,
        bond: u128,
    },
    SubmitProof {
        sender: AccountId,
        claim_id: ClaimId,
        artifact_bytes: Vec<u8>,
    },
    Reveal {
        sender: AccountId,
        claim_id: ClaimId,
        witness_plaintext: Vec<u8>,
        blinding_value: Vec<u8>,
    },
    TriggerTimeout(TimeoutTarget),
    CancelProgram {
        sender: AccountId,
        program_id: ProgramId,
    },
}

impl Command {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateProgram { .. } => "create_program",
            Command::SubmitCommitment { .. } => "submit_commitment",
            Command::SubmitProof { .. } => "submit_proof",
            Command::Reveal { .. } => "reveal",
            Command::TriggerTimeout(_) => "trigger_timeout",
            Command::CancelProgram { .. } => "cancel_program",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutTarget {
    Claim(ClaimId),
    Program(ProgramId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Verified { payout: u128 },
    Rejected(RejectionReason),
    Superseded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    Closed,
    Mismatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeoutOutcome {
    ClaimExpired {
        claim_id: ClaimId,
        bond_refunded: u128,
    },
    ClaimSlashed {
        claim_id: ClaimId,
        bond_forfeited: u128,
    },
    ProgramExpired {
        program_id: ProgramId,
        refunded: u128,
        claims_expired: Vec<ClaimId>,
    },
}

/// Successful result of a command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    ProgramCreated(ProgramId),
    CommitmentRecorded(ClaimId),
    Proof(ClaimOutcome),
    Reveal(RevealOutcome),
    Timeout(TimeoutOutcome),
    Cancelled(ProgramId),
}
