// Ledger simulator for the bounty escrow
// One task orders every command, stamps it with a block height and time,
// applies it to the escrow and fans out the resulting events

pub mod clock;
pub mod config;
pub mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SequencerConfig;
pub use ledger::{SequencedReceipt, Sequencer, SequencerError};
