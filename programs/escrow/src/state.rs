use prover::{CommitmentHash, ProgramId, ProofArtifact, PublicInputs, TargetId, VerificationKeyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger time in seconds, as stamped by the sequencer
pub type Timestamp = u64;

/// Ledger account (owner or claimant)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub u64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claim#{}", self.0)
    }
}

/// Owner-chosen parameters, fixed once funds are locked
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramTerms {
    pub target: TargetId,
    pub threshold_loss: u128,
    pub claim_window: u64,
    pub reveal_window: u64,
    pub verification_key_id: VerificationKeyId,
    pub min_bond: u128,
    pub expires_at: Option<Timestamp>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramStatus {
    Funded,
    Awarded(ClaimId),
    Expired,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BountyProgram {
    pub id: ProgramId,
    pub owner: AccountId,
    pub terms: ProgramTerms,
    pub funds_locked: u128,
    pub status: ProgramStatus,
    pub forfeited_bonds: u128,
    pub commitments_recorded: u64,
    pub created_at: Timestamp,
}

impl BountyProgram {
    pub fn is_funded(&self) -> bool {
        self.status == ProgramStatus::Funded
    }

    /// Whether `now` is at or past the program expiry, if it has one
    pub fn has_expired_at(&self, now: Timestamp) -> bool {
        self.terms.expires_at.is_some_and(|t| now >= t)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    ClaimOpen,
    ProofSubmitted,
    Verified,
    Paid,
    RevealWindow,
    Closed,
    Slashed,
    Expired,
    Superseded,
}

impl ClaimStatus {
    /// Still competing for the bounty
    pub fn is_live(self) -> bool {
        matches!(self, ClaimStatus::ClaimOpen | ClaimStatus::ProofSubmitted)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ClaimStatus::Closed | ClaimStatus::Slashed | ClaimStatus::Expired | ClaimStatus::Superseded
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub program_id: ProgramId,
    pub claimant: AccountId,
    pub commitment_hash: CommitmentHash,
    pub submitted_at: Timestamp,
}

/// Disclosed opening. Only ever lives in escrow state, never in events.
#[derive(Clone, PartialEq, Eq)]
pub struct Reveal {
    pub claim_id: ClaimId,
    pub witness_plaintext: Vec<u8>,
    pub blinding_value: Vec<u8>,
    pub revealed_at: Timestamp,
}

impl fmt::Debug for Reveal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reveal")
            .field("claim_id", &self.claim_id)
            .field("witness_len", &self.witness_plaintext.len())
            .field("revealed_at", &self.revealed_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub id: ClaimId,
    pub program_id: ProgramId,
    pub claimant: AccountId,
    pub commitment: Commitment,
    pub public_inputs: PublicInputs,
    pub status: ClaimStatus,
    pub proof_artifact: Option<ProofArtifact>,
    pub reveal: Option<Reveal>,
    pub bond: u128,
    pub claim_deadline: Timestamp,
    pub reveal_deadline: Option<Timestamp>,
    pub payout: u128,
    pub rejected_proofs: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_and_terminal_partition() {
        use ClaimStatus::*;
        for status in [ClaimOpen, ProofSubmitted] {
            assert!(status.is_live() && !status.is_terminal());
        }
        for status in [Verified, Paid, RevealWindow] {
            assert!(!status.is_live() && !status.is_terminal());
        }
        for status in [Closed, Slashed, Expired, Superseded] {
            assert!(!status.is_live() && status.is_terminal());
        }
    }

    #[test]
    fn test_account_id_serializes_as_string() {
        let json = serde_json::to_string(&AccountId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }
}
