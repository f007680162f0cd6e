use anyhow::{Context, Result};
use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;
use clap::{Parser, ValueEnum};
use prover::{setup, BalanceDrainLoss, FullBalanceLoss, LossGadget, VerificationKey};
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Gadget {
    BalanceDrain,
    FullBalance,
}

#[derive(Parser)]
#[command(name = "export-vk")]
#[command(about = "Generate Groth16 keys for a loss gadget and export the verification key record")]
struct Args {
    #[arg(short, long, value_enum, default_value = "balance-drain")]
    gadget: Gadget,

    #[arg(short, long, default_value = "verification_key.bin")]
    out: PathBuf,

    /// Setup seed; the same seed regenerates the same key pair
    #[arg(long)]
    seed: u64,
}

fn export<L: LossGadget>(loss: L, seed: u64) -> Result<VerificationKey> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (_, vk) = setup(loss, &mut rng).context("key generation failed")?;
    Ok(vk)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let vk = match args.gadget {
        Gadget::BalanceDrain => export(BalanceDrainLoss, args.seed)?,
        Gadget::FullBalance => export(FullBalanceLoss, args.seed)?,
    };

    let record = vk.to_record().context("failed to encode verification key")?;
    std::fs::write(&args.out, &record)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(gadget = vk.gadget(), bytes = record.len(), path = %args.out.display(), "Exported verification key");
    println!("{}", vk.id());
    Ok(())
}
