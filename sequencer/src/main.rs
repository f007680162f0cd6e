use anyhow::{bail, Context, Result};
use clap::Parser;
use escrow::{
    AccountId, ClaimId, ClaimOutcome, Command, Escrow, ProgramTerms, Receipt, TimeoutTarget,
};
use prover::{commit_opening, setup, BalanceDrainLoss, Blinding, Opening, ProgramId, TargetId, Witness};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sequencer::{ManualClock, Sequencer, SequencerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verifier::KeyRegistry;

const GENESIS: u64 = 1_700_000_000;

#[derive(Parser)]
#[command(name = "bounty-sim")]
#[command(about = "Run one exploit bounty claim end to end and print the escrow event log")]
pub struct Args {
    /// Sequencer config (JSON); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "7")]
    pub seed: u64,

    #[arg(long, default_value = "1000000")]
    pub bounty: u128,

    #[arg(long, default_value = "100000")]
    pub threshold: u128,

    /// Amount the simulated exploit drains from the target
    #[arg(long, default_value = "250000")]
    pub drained: u128,

    #[arg(long, default_value = "5000")]
    pub bond: u128,

    /// Withhold the reveal and let the claim be slashed
    #[arg(long)]
    pub skip_reveal: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SequencerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SequencerConfig::default(),
    };

    info!("Generating proving and verification keys...");
    let seed = args.seed;
    let (pk, vk) = tokio::task::spawn_blocking(move || {
        setup(BalanceDrainLoss, &mut StdRng::seed_from_u64(seed))
    })
    .await
    .context("Key generation task failed")??;
    info!(verification_key = %vk.id(), "Keys ready");

    let mut registry = KeyRegistry::new();
    registry.register(&vk);
    let escrow = Escrow::new(config.escrow.clone(), Arc::new(registry));
    let clock = Arc::new(ManualClock::new(GENESIS));
    let (ledger, worker) = Sequencer::spawn(escrow, clock.clone(), &config);

    let target = TargetId([0xab; 32]);
    let owner = AccountId::new("protocol");
    let claimant = AccountId::new("whitehat");
    let terms = ProgramTerms {
        target,
        threshold_loss: args.threshold,
        claim_window: 3_600,
        reveal_window: 86_400,
        verification_key_id: vk.id(),
        min_bond: args.bond,
        expires_at: Some(GENESIS + 30 * 86_400),
    };
    let reveal_window = terms.reveal_window;

    let program_id = match ledger
        .submit(Command::CreateProgram {
            owner,
            terms,
            funds: args.bounty,
        })
        .await?
        .receipt
    {
        Receipt::ProgramCreated(id) => id,
        other => bail!("Unexpected receipt {:?}", other),
    };

    // The claimant keeps the opening; only the hash goes on the ledger
    let pre_balance = args.drained.max(args.threshold).saturating_mul(2);
    let witness = Witness::new(
        target,
        pre_balance,
        pre_balance - args.drained,
        vec![0xa9, 0x05, 0x9c, 0xbb, 0x00, 0x01],
    )
    .context("Failed to build witness")?;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let opening = Opening::new(witness, Blinding::random(&mut rng));

    clock.advance(12);
    let claim_id = commit(&ledger, &claimant, program_id, &opening, args.bond).await?;
    let public_inputs = ledger
        .with_state(|escrow| escrow.claim(claim_id).map(|claim| claim.public_inputs))
        .context("Claim vanished after commitment")?;

    info!(%claim_id, "Proving exploit statement...");
    let prover_opening = opening.clone();
    let artifact = tokio::task::spawn_blocking(move || {
        prover::generate_with_rng(&prover_opening, &public_inputs, &pk, &mut rng)
    })
    .await
    .context("Proof generation task failed")??;

    clock.advance(60);
    let proof = ledger
        .submit(Command::SubmitProof {
            sender: claimant.clone(),
            claim_id,
            artifact_bytes: artifact.to_bytes(),
        })
        .await?;
    match proof.receipt {
        Receipt::Proof(ClaimOutcome::Verified { payout }) => {
            info!(height = proof.height, payout, "Bounty paid")
        }
        other => bail!("Proof was not accepted: {:?}", other),
    }

    if args.skip_reveal {
        clock.advance(reveal_window);
        let timeout = ledger
            .submit(Command::TriggerTimeout(TimeoutTarget::Claim(claim_id)))
            .await?;
        info!(height = timeout.height, receipt = ?timeout.receipt, "Reveal window closed");
    } else {
        clock.advance(600);
        let reveal = ledger
            .submit(Command::Reveal {
                sender: claimant.clone(),
                claim_id,
                witness_plaintext: opening.witness.to_bytes(),
                blinding_value: opening.blinding.to_bytes().to_vec(),
            })
            .await?;
        info!(height = reveal.height, receipt = ?reveal.receipt, "Exploit disclosed");
    }

    let log = ledger.with_state(|escrow| serde_json::to_string_pretty(escrow.events()))?;
    println!("{}", log);
    info!(
        claimant_balance = %ledger.with_state(|escrow| escrow.balance(&claimant)),
        height = ledger.height(),
        "Simulation finished"
    );

    drop(ledger);
    worker.await.context("Sequencer task panicked")?;
    Ok(())
}

async fn commit(
    ledger: &Sequencer,
    claimant: &AccountId,
    program_id: ProgramId,
    opening: &Opening,
    bond: u128,
) -> Result<ClaimId> {
    let sequenced = ledger
        .submit(Command::SubmitCommitment {
            claimant: claimant.clone(),
            program_id,
            commitment: commit_opening(opening),
            bond,
        })
        .await?;
    match sequenced.receipt {
        Receipt::CommitmentRecorded(id) => Ok(id),
        other => bail!("Unexpected receipt {:?}", other),
    }
}
