// Exploit bounty escrow
// Custody of bounty funds and claimant bonds, commitment bookkeeping,
// proof-gated payout and post-payout reveal with slashing

pub mod command;
pub mod config;
pub mod error;
pub mod escrow;
pub mod events;
pub mod state;

pub use command::{ClaimOutcome, Command, Receipt, RevealOutcome, TimeoutOutcome, TimeoutTarget};
pub use config::{ConfigError, EscrowConfig};
pub use error::EscrowError;
pub use escrow::Escrow;
pub use events::{EscrowEvent, EventRecord, RejectionReason, SlashReason};
pub use state::{
    AccountId, BountyProgram, Claim, ClaimId, ClaimStatus, Commitment, ProgramStatus,
    ProgramTerms, Reveal, Timestamp,
};
