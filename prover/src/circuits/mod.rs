// Statement definition: the R1CS relation proven by a bounty claim

pub mod encoding;
pub mod exploit;
pub mod gadgets;
pub mod loss;

pub use encoding::EncodedWitness;
pub use exploit::ExploitCircuit;
pub use gadgets::LOSS_BITS;
pub use loss::{BalanceDrainLoss, FullBalanceLoss, LossGadget, TargetVars, WitnessVars};
