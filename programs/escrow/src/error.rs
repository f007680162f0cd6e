use crate::state::{ClaimId, ClaimStatus, ProgramStatus, Timestamp};
use prover::ProgramId;
use thiserror::Error;

/// Command failures. The escrow state is unchanged whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error("Claim {0} not found")]
    ClaimNotFound(ClaimId),
    #[error("Program {program} is {status:?}, not Funded")]
    ProgramNotFunded {
        program: ProgramId,
        status: ProgramStatus,
    },
    #[error("Program {0} has passed its expiry")]
    ProgramExpired(ProgramId),
    #[error("Invalid program terms: {0}")]
    InvalidTerms(String),
    #[error("Bounty funds must be non-zero")]
    ZeroFunds,
    #[error("Verification key is not registered")]
    UnknownVerificationKey,
    #[error("Bond {offered} below required {required}")]
    BondTooLow { required: u128, offered: u128 },
    #[error("Commitment is held by another claim")]
    DuplicateCommitment,
    #[error("Program already has {max} open claims")]
    TooManyOpenClaims { max: usize },
    #[error("Commitment is not recorded or no longer active")]
    UnknownCommitment,
    #[error("Commitment does not belong to this claim or sender")]
    CommitmentMismatch,
    #[error("Claim window elapsed")]
    ClaimWindowElapsed,
    #[error("Claim {claim} is {status:?}; cannot {action}")]
    InvalidTransition {
        claim: ClaimId,
        status: ClaimStatus,
        action: &'static str,
    },
    #[error("Reveal window elapsed")]
    RevealWindowElapsed,
    #[error("Claim already revealed")]
    AlreadyRevealed,
    #[error("Deadline {deadline} not reached at {now}")]
    TimeoutNotReached { deadline: Timestamp, now: Timestamp },
    #[error("Program {0} has no expiry")]
    NoProgramExpiry(ProgramId),
    #[error("Program cannot be cancelled after a commitment was recorded")]
    CancelNotAllowed,
    #[error("Unauthorized access")]
    Unauthorized,
    #[error("Math overflow")]
    MathOverflow,
    #[error("Math underflow")]
    MathUnderflow,
}
