use crate::command::{ClaimOutcome, Command, Receipt, RevealOutcome, TimeoutOutcome, TimeoutTarget};
use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::events::{EscrowEvent, EventRecord, RejectionReason, SlashReason};
use crate::state::{
    AccountId, BountyProgram, Claim, ClaimId, ClaimStatus, Commitment, ProgramStatus,
    ProgramTerms, Reveal, Timestamp,
};
use prover::{opens_to, CommitmentHash, ProgramId, ProofArtifact, PublicInputs};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use verifier::ProofVerifier;

/// Bounty escrow state machine.
///
/// Programs and claims live in arenas indexed by their ids. Every operation
/// validates completely before touching state, so an `Err` leaves the escrow
/// exactly as it was.
pub struct Escrow {
    config: EscrowConfig,
    verifier: Arc<dyn ProofVerifier>,
    programs: Vec<BountyProgram>,
    claims: Vec<Claim>,
    commitments: HashMap<CommitmentHash, ClaimId>,
    balances: HashMap<AccountId, u128>,
    locked: u128,
    events: Vec<EventRecord>,
}

impl Escrow {
    pub fn new(config: EscrowConfig, verifier: Arc<dyn ProofVerifier>) -> Self {
        Self {
            config,
            verifier,
            programs: Vec::new(),
            claims: Vec::new(),
            commitments: HashMap::new(),
            balances: HashMap::new(),
            locked: 0,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn program(&self, id: ProgramId) -> Option<&BountyProgram> {
        usize::try_from(id.0).ok().and_then(|i| self.programs.get(i))
    }

    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        usize::try_from(id.0).ok().and_then(|i| self.claims.get(i))
    }

    pub fn claims_for(&self, program_id: ProgramId) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(move |c| c.program_id == program_id)
    }

    /// Amount released to an account by payouts, refunds and forfeitures
    pub fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Funds and bonds currently in custody
    pub fn locked(&self) -> u128 {
        self.locked
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence).unwrap_or(usize::MAX).min(self.events.len());
        &self.events[start..]
    }

    /// Single entry point used by the sequencer
    pub fn apply(&mut self, now: Timestamp, command: Command) -> Result<Receipt, EscrowError> {
        match command {
            Command::CreateProgram {
                owner,
                terms,
                funds,
            } => self
                .create_program(now, owner, terms, funds)
                .map(Receipt::ProgramCreated),
            Command::SubmitCommitment {
                claimant,
                program_id,
                commitment,
                bond,
            } => self
                .submit_commitment(now, claimant, program_id, commitment, bond)
                .map(Receipt::CommitmentRecorded),
            Command::SubmitProof {
                sender,
                claim_id,
                artifact_bytes,
            } => self
                .submit_proof(now, &sender, claim_id, &artifact_bytes)
                .map(Receipt::Proof),
            Command::Reveal {
                sender,
                claim_id,
                witness_plaintext,
                blinding_value,
            } => self
                .reveal(now, &sender, claim_id, witness_plaintext, blinding_value)
                .map(Receipt::Reveal),
            Command::TriggerTimeout(target) => {
                self.trigger_timeout(now, target).map(Receipt::Timeout)
            }
            Command::CancelProgram { sender, program_id } => self
                .cancel_program(now, &sender, program_id)
                .map(Receipt::Cancelled),
        }
    }

    /// Lock a bounty under fixed terms
    pub fn create_program(
        &mut self,
        now: Timestamp,
        owner: AccountId,
        terms: ProgramTerms,
        funds: u128,
    ) -> Result<ProgramId, EscrowError> {
        if funds == 0 {
            return Err(EscrowError::ZeroFunds);
        }
        if terms.claim_window < self.config.min_claim_window {
            return Err(EscrowError::InvalidTerms(format!(
                "claim window {} below minimum {}",
                terms.claim_window, self.config.min_claim_window
            )));
        }
        if terms.reveal_window < self.config.min_reveal_window {
            return Err(EscrowError::InvalidTerms(format!(
                "reveal window {} below minimum {}",
                terms.reveal_window, self.config.min_reveal_window
            )));
        }
        if let Some(expires_at) = terms.expires_at {
            if expires_at <= now {
                return Err(EscrowError::InvalidTerms(format!(
                    "expiry {} is not in the future",
                    expires_at
                )));
            }
        }
        if !self.verifier.knows(&terms.verification_key_id) {
            return Err(EscrowError::UnknownVerificationKey);
        }
        let locked = self
            .locked
            .checked_add(funds)
            .ok_or(EscrowError::MathOverflow)?;

        let id = ProgramId(self.programs.len() as u64);
        self.locked = locked;
        self.programs.push(BountyProgram {
            id,
            owner: owner.clone(),
            terms: terms.clone(),
            funds_locked: funds,
            status: ProgramStatus::Funded,
            forfeited_bonds: 0,
            commitments_recorded: 0,
            created_at: now,
        });

        info!(program = %id, owner = %owner, funds, threshold = terms.threshold_loss, "Bounty program funded");
        self.emit(
            now,
            EscrowEvent::ProgramCreated {
                program_id: id,
                owner,
                target: terms.target,
                threshold_loss: terms.threshold_loss,
                funds,
                verification_key_id: terms.verification_key_id,
            },
        );
        Ok(id)
    }

    /// Record a bonded commitment and open a claim on it
    pub fn submit_commitment(
        &mut self,
        now: Timestamp,
        claimant: AccountId,
        program_id: ProgramId,
        commitment: CommitmentHash,
        bond: u128,
    ) -> Result<ClaimId, EscrowError> {
        let program = self.funded_program(program_id)?;
        if program.has_expired_at(now) {
            return Err(EscrowError::ProgramExpired(program_id));
        }

        let required = self.config.min_bond.max(program.terms.min_bond);
        if bond < required {
            return Err(EscrowError::BondTooLow {
                required,
                offered: bond,
            });
        }

        // A hash stays with its first claimant; only they may record it again
        // once their earlier claim is terminal
        if let Some(existing) = self.commitments.get(&commitment) {
            if self
                .claim(*existing)
                .is_some_and(|c| !c.status.is_terminal() || c.claimant != claimant)
            {
                return Err(EscrowError::DuplicateCommitment);
            }
        }

        let open = self
            .claims_for(program_id)
            .filter(|c| c.status.is_live())
            .count();
        if open >= self.config.max_open_claims_per_program {
            return Err(EscrowError::TooManyOpenClaims {
                max: self.config.max_open_claims_per_program,
            });
        }

        let claim_deadline = now
            .checked_add(program.terms.claim_window)
            .ok_or(EscrowError::MathOverflow)?;
        let locked = self
            .locked
            .checked_add(bond)
            .ok_or(EscrowError::MathOverflow)?;
        let public_inputs = PublicInputs::new(
            program_id,
            program.terms.target,
            program.terms.threshold_loss,
            commitment,
        );

        let id = ClaimId(self.claims.len() as u64);
        self.locked = locked;
        self.claims.push(Claim {
            id,
            program_id,
            claimant: claimant.clone(),
            commitment: Commitment {
                program_id,
                claimant: claimant.clone(),
                commitment_hash: commitment,
                submitted_at: now,
            },
            public_inputs,
            status: ClaimStatus::ClaimOpen,
            proof_artifact: None,
            reveal: None,
            bond,
            claim_deadline,
            reveal_deadline: None,
            payout: 0,
            rejected_proofs: 0,
        });
        self.commitments.insert(commitment, id);
        self.program_mut(program_id)?.commitments_recorded += 1;

        info!(claim = %id, program = %program_id, claimant = %claimant, commitment = %commitment, bond, "Commitment recorded");
        self.emit(
            now,
            EscrowEvent::CommitmentRecorded {
                claim_id: id,
                claimant,
                public_inputs,
                bond,
                claim_deadline,
            },
        );
        Ok(id)
    }

    /// Verify a proof for a claim and, on success, pay the bounty in the same
    /// transition. The first valid proof wins; every other live claim is
    /// superseded.
    pub fn submit_proof(
        &mut self,
        now: Timestamp,
        sender: &AccountId,
        claim_id: ClaimId,
        artifact_bytes: &[u8],
    ) -> Result<ClaimOutcome, EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;

        let artifact = match ProofArtifact::from_bytes(artifact_bytes) {
            Ok(artifact) => artifact,
            Err(e) => {
                if claim.status == ClaimStatus::Superseded {
                    return Ok(ClaimOutcome::Superseded);
                }
                if &claim.claimant != sender {
                    return Err(EscrowError::CommitmentMismatch);
                }
                self.check_proof_window(claim, now)?;
                debug!(claim = %claim_id, error = %e, "Malformed proof artifact");
                return Ok(self.reject_proof(now, claim_id, RejectionReason::MalformedArtifact));
            }
        };

        match self.commitments.get(&artifact.public_inputs.commitment) {
            None => return Err(EscrowError::UnknownCommitment),
            Some(owner) if *owner != claim_id => {
                let other_terminal = self
                    .claim(*owner)
                    .map_or(true, |c| c.status.is_terminal());
                return Err(if other_terminal {
                    EscrowError::UnknownCommitment
                } else {
                    EscrowError::CommitmentMismatch
                });
            }
            Some(_) => {}
        }
        if &claim.claimant != sender {
            return Err(EscrowError::CommitmentMismatch);
        }
        if claim.status == ClaimStatus::Superseded {
            return Ok(ClaimOutcome::Superseded);
        }
        self.check_proof_window(claim, now)?;

        if artifact.public_inputs != claim.public_inputs {
            return Ok(self.reject_proof(now, claim_id, RejectionReason::PublicInputsMismatch));
        }

        let program = self.funded_program(claim.program_id)?;
        let accepted = artifact.verification_key_id == program.terms.verification_key_id
            && self.verifier.verify(&artifact, &claim.public_inputs);
        if !accepted {
            return Ok(self.reject_proof(now, claim_id, RejectionReason::ProofInvalid));
        }

        self.award(now, claim_id, artifact)
    }

    /// Disclose the opening after payout. Only the claimant may reveal; a
    /// mismatch slashes their bond.
    pub fn reveal(
        &mut self,
        now: Timestamp,
        sender: &AccountId,
        claim_id: ClaimId,
        witness_plaintext: Vec<u8>,
        blinding_value: Vec<u8>,
    ) -> Result<RevealOutcome, EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;
        if &claim.claimant != sender {
            return Err(EscrowError::Unauthorized);
        }
        if claim.reveal.is_some() {
            return Err(EscrowError::AlreadyRevealed);
        }
        if claim.status != ClaimStatus::RevealWindow {
            return Err(EscrowError::InvalidTransition {
                claim: claim_id,
                status: claim.status,
                action: "reveal",
            });
        }
        let deadline = claim.reveal_deadline.unwrap_or(Timestamp::MIN);
        if now >= deadline {
            return Err(EscrowError::RevealWindowElapsed);
        }

        let matched = opens_to(
            &claim.commitment.commitment_hash,
            &witness_plaintext,
            &blinding_value,
        );
        let public_inputs = claim.public_inputs;
        let bond = claim.bond;
        let reveal = Reveal {
            claim_id,
            witness_plaintext,
            blinding_value,
            revealed_at: now,
        };

        if matched {
            let locked = self
                .locked
                .checked_sub(bond)
                .ok_or(EscrowError::MathUnderflow)?;
            let claimant = claim.claimant.clone();
            self.credit(&claimant, bond)?;
            self.locked = locked;
            let claim = self.claim_mut(claim_id)?;
            claim.reveal = Some(reveal);
            claim.status = ClaimStatus::Closed;

            info!(claim = %claim_id, "Reveal matched commitment, claim closed");
            self.emit(
                now,
                EscrowEvent::Revealed {
                    claim_id,
                    public_inputs,
                    matched: true,
                },
            );
            Ok(RevealOutcome::Closed)
        } else {
            // Validate the slash before recording anything
            self.slash_amounts(claim_id)?;
            self.claim_mut(claim_id)?.reveal = Some(reveal);
            self.emit(
                now,
                EscrowEvent::Revealed {
                    claim_id,
                    public_inputs,
                    matched: false,
                },
            );
            self.slash(now, claim_id, SlashReason::RevealMismatch)?;
            Ok(RevealOutcome::Mismatch)
        }
    }

    /// Fire a deadline that has passed. Never fires early.
    pub fn trigger_timeout(
        &mut self,
        now: Timestamp,
        target: TimeoutTarget,
    ) -> Result<TimeoutOutcome, EscrowError> {
        match target {
            TimeoutTarget::Claim(claim_id) => self.claim_timeout(now, claim_id),
            TimeoutTarget::Program(program_id) => self.program_timeout(now, program_id),
        }
    }

    /// Withdraw a bounty nobody has committed against
    pub fn cancel_program(
        &mut self,
        now: Timestamp,
        sender: &AccountId,
        program_id: ProgramId,
    ) -> Result<ProgramId, EscrowError> {
        let program = self
            .program(program_id)
            .ok_or(EscrowError::ProgramNotFound(program_id))?;
        if &program.owner != sender {
            return Err(EscrowError::Unauthorized);
        }
        let program = self.funded_program(program_id)?;
        if program.commitments_recorded > 0 {
            return Err(EscrowError::CancelNotAllowed);
        }

        let refunded = program.funds_locked;
        let owner = program.owner.clone();
        let locked = self
            .locked
            .checked_sub(refunded)
            .ok_or(EscrowError::MathUnderflow)?;
        self.credit(&owner, refunded)?;
        self.locked = locked;
        let program = self.program_mut(program_id)?;
        program.funds_locked = 0;
        program.status = ProgramStatus::Cancelled;

        info!(program = %program_id, refunded, "Bounty program cancelled");
        self.emit(
            now,
            EscrowEvent::Cancelled {
                program_id,
                refunded,
            },
        );
        Ok(program_id)
    }

    fn claim_timeout(
        &mut self,
        now: Timestamp,
        claim_id: ClaimId,
    ) -> Result<TimeoutOutcome, EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;

        match claim.status {
            status if status.is_live() => {
                if now < claim.claim_deadline {
                    return Err(EscrowError::TimeoutNotReached {
                        deadline: claim.claim_deadline,
                        now,
                    });
                }
                let bond_refunded = self.expire_claim(now, claim_id)?;
                Ok(TimeoutOutcome::ClaimExpired {
                    claim_id,
                    bond_refunded,
                })
            }
            ClaimStatus::RevealWindow => {
                let deadline = claim.reveal_deadline.unwrap_or(Timestamp::MIN);
                if now < deadline {
                    return Err(EscrowError::TimeoutNotReached { deadline, now });
                }
                let bond_forfeited = self.slash(now, claim_id, SlashReason::RevealMissing)?;
                Ok(TimeoutOutcome::ClaimSlashed {
                    claim_id,
                    bond_forfeited,
                })
            }
            status => Err(EscrowError::InvalidTransition {
                claim: claim_id,
                status,
                action: "time out",
            }),
        }
    }

    fn program_timeout(
        &mut self,
        now: Timestamp,
        program_id: ProgramId,
    ) -> Result<TimeoutOutcome, EscrowError> {
        let program = self.funded_program(program_id)?;
        let expires_at = program
            .terms
            .expires_at
            .ok_or(EscrowError::NoProgramExpiry(program_id))?;
        if now < expires_at {
            return Err(EscrowError::TimeoutNotReached {
                deadline: expires_at,
                now,
            });
        }

        let refunded = program.funds_locked;
        let owner = program.owner.clone();
        let live: Vec<(ClaimId, u128)> = self
            .claims_for(program_id)
            .filter(|c| c.status.is_live())
            .map(|c| (c.id, c.bond))
            .collect();
        let bonds = live
            .iter()
            .try_fold(0u128, |acc, (_, bond)| acc.checked_add(*bond))
            .ok_or(EscrowError::MathOverflow)?;
        let outflow = refunded.checked_add(bonds).ok_or(EscrowError::MathOverflow)?;
        if self.locked < outflow {
            return Err(EscrowError::MathUnderflow);
        }

        let mut claims_expired = Vec::with_capacity(live.len());
        for (claim_id, _) in live {
            self.expire_claim(now, claim_id)?;
            claims_expired.push(claim_id);
        }

        self.credit(&owner, refunded)?;
        self.locked -= refunded;
        let program = self.program_mut(program_id)?;
        program.funds_locked = 0;
        program.status = ProgramStatus::Expired;

        info!(program = %program_id, refunded, claims = claims_expired.len(), "Bounty program expired");
        self.emit(
            now,
            EscrowEvent::ProgramExpired {
                program_id,
                refunded,
            },
        );
        Ok(TimeoutOutcome::ProgramExpired {
            program_id,
            refunded,
            claims_expired,
        })
    }

    /// Verified -> Paid -> RevealWindow, superseding every rival, as one step
    fn award(
        &mut self,
        now: Timestamp,
        claim_id: ClaimId,
        artifact: ProofArtifact,
    ) -> Result<ClaimOutcome, EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;
        let program_id = claim.program_id;
        let claimant = claim.claimant.clone();
        let public_inputs = claim.public_inputs;
        let program = self.funded_program(program_id)?;
        let payout = program.funds_locked;
        let reveal_deadline = now
            .checked_add(program.terms.reveal_window)
            .ok_or(EscrowError::MathOverflow)?;

        let rivals: Vec<(ClaimId, u128, AccountId, PublicInputs)> = self
            .claims_for(program_id)
            .filter(|c| c.id != claim_id && c.status.is_live())
            .map(|c| (c.id, c.bond, c.claimant.clone(), c.public_inputs))
            .collect();
        let refunds = rivals
            .iter()
            .try_fold(0u128, |acc, (_, bond, _, _)| acc.checked_add(*bond))
            .ok_or(EscrowError::MathOverflow)?;
        let outflow = payout.checked_add(refunds).ok_or(EscrowError::MathOverflow)?;
        let locked = self
            .locked
            .checked_sub(outflow)
            .ok_or(EscrowError::MathUnderflow)?;

        let mut credits: HashMap<&AccountId, u128> = HashMap::new();
        for (_, bond, rival, _) in &rivals {
            let total = credits.entry(rival).or_insert(0);
            *total = total.checked_add(*bond).ok_or(EscrowError::MathOverflow)?;
        }
        let total = credits.entry(&claimant).or_insert(0);
        *total = total.checked_add(payout).ok_or(EscrowError::MathOverflow)?;
        for (account, amount) in &credits {
            self.balance(account)
                .checked_add(*amount)
                .ok_or(EscrowError::MathOverflow)?;
        }

        // Validated; apply
        let claim = self.claim_mut(claim_id)?;
        claim.status = ClaimStatus::Verified;
        claim.proof_artifact = Some(artifact);
        info!(claim = %claim_id, program = %program_id, "Proof verified");
        self.emit(
            now,
            EscrowEvent::ProofVerified {
                claim_id,
                public_inputs,
            },
        );

        for (rival_id, bond, rival, rival_inputs) in rivals {
            self.credit(&rival, bond)?;
            self.claim_mut(rival_id)?.status = ClaimStatus::Superseded;
            debug!(claim = %rival_id, winner = %claim_id, "Claim superseded");
            self.emit(
                now,
                EscrowEvent::ClaimSuperseded {
                    claim_id: rival_id,
                    public_inputs: rival_inputs,
                    winner: claim_id,
                    bond_refunded: bond,
                },
            );
        }

        self.credit(&claimant, payout)?;
        self.locked = locked;
        let program = self.program_mut(program_id)?;
        program.funds_locked = 0;
        program.status = ProgramStatus::Awarded(claim_id);

        let claim = self.claim_mut(claim_id)?;
        claim.status = ClaimStatus::Paid;
        claim.payout = payout;
        info!(claim = %claim_id, claimant = %claimant, amount = payout, "Bounty paid");
        self.emit(
            now,
            EscrowEvent::Paid {
                claim_id,
                public_inputs,
                claimant,
                amount: payout,
                reveal_deadline,
            },
        );

        let claim = self.claim_mut(claim_id)?;
        claim.status = ClaimStatus::RevealWindow;
        claim.reveal_deadline = Some(reveal_deadline);

        Ok(ClaimOutcome::Verified { payout })
    }

    fn reject_proof(
        &mut self,
        now: Timestamp,
        claim_id: ClaimId,
        reason: RejectionReason,
    ) -> ClaimOutcome {
        let public_inputs = match self.claim_mut(claim_id) {
            Ok(claim) => {
                claim.status = ClaimStatus::ProofSubmitted;
                claim.rejected_proofs = claim.rejected_proofs.saturating_add(1);
                claim.public_inputs
            }
            Err(_) => return ClaimOutcome::Rejected(reason),
        };
        debug!(claim = %claim_id, ?reason, "Proof rejected");
        self.emit(
            now,
            EscrowEvent::ProofRejected {
                claim_id,
                public_inputs,
                reason,
            },
        );
        ClaimOutcome::Rejected(reason)
    }

    fn check_proof_window(&self, claim: &Claim, now: Timestamp) -> Result<(), EscrowError> {
        if !claim.status.is_live() {
            return Err(EscrowError::InvalidTransition {
                claim: claim.id,
                status: claim.status,
                action: "submit a proof",
            });
        }
        if now >= claim.claim_deadline {
            return Err(EscrowError::ClaimWindowElapsed);
        }
        let program = self.funded_program(claim.program_id)?;
        if program.has_expired_at(now) {
            return Err(EscrowError::ProgramExpired(claim.program_id));
        }
        Ok(())
    }

    /// Live claim -> Expired with its bond refunded
    fn expire_claim(&mut self, now: Timestamp, claim_id: ClaimId) -> Result<u128, EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;
        let bond = claim.bond;
        let claimant = claim.claimant.clone();
        let public_inputs = claim.public_inputs;
        let locked = self
            .locked
            .checked_sub(bond)
            .ok_or(EscrowError::MathUnderflow)?;

        self.credit(&claimant, bond)?;
        self.locked = locked;
        self.claim_mut(claim_id)?.status = ClaimStatus::Expired;

        info!(claim = %claim_id, bond, "Claim expired, bond refunded");
        self.emit(
            now,
            EscrowEvent::ClaimExpired {
                claim_id,
                public_inputs,
                bond_refunded: bond,
            },
        );
        Ok(bond)
    }

    fn slash_amounts(&self, claim_id: ClaimId) -> Result<(ProgramId, AccountId, u128), EscrowError> {
        let claim = self.claim(claim_id).ok_or(EscrowError::ClaimNotFound(claim_id))?;
        let program = self
            .program(claim.program_id)
            .ok_or(EscrowError::ProgramNotFound(claim.program_id))?;
        self.locked
            .checked_sub(claim.bond)
            .ok_or(EscrowError::MathUnderflow)?;
        self.balance(&program.owner)
            .checked_add(claim.bond)
            .ok_or(EscrowError::MathOverflow)?;
        Ok((program.id, program.owner.clone(), claim.bond))
    }

    /// Forfeit the bond to the program owner. The payout stands.
    fn slash(
        &mut self,
        now: Timestamp,
        claim_id: ClaimId,
        reason: SlashReason,
    ) -> Result<u128, EscrowError> {
        let (program_id, owner, bond) = self.slash_amounts(claim_id)?;

        self.credit(&owner, bond)?;
        self.locked -= bond;
        let program = self.program_mut(program_id)?;
        program.forfeited_bonds = program.forfeited_bonds.saturating_add(bond);
        let claim = self.claim_mut(claim_id)?;
        claim.status = ClaimStatus::Slashed;
        let public_inputs = claim.public_inputs;

        warn!(claim = %claim_id, ?reason, bond, "Claim slashed");
        self.emit(
            now,
            EscrowEvent::Slashed {
                claim_id,
                public_inputs,
                reason,
                bond_forfeited: bond,
            },
        );
        Ok(bond)
    }

    fn funded_program(&self, program_id: ProgramId) -> Result<&BountyProgram, EscrowError> {
        let program = self
            .program(program_id)
            .ok_or(EscrowError::ProgramNotFound(program_id))?;
        if !program.is_funded() {
            return Err(EscrowError::ProgramNotFunded {
                program: program_id,
                status: program.status,
            });
        }
        Ok(program)
    }

    fn program_mut(&mut self, id: ProgramId) -> Result<&mut BountyProgram, EscrowError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.programs.get_mut(i))
            .ok_or(EscrowError::ProgramNotFound(id))
    }

    fn claim_mut(&mut self, id: ClaimId) -> Result<&mut Claim, EscrowError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.claims.get_mut(i))
            .ok_or(EscrowError::ClaimNotFound(id))
    }

    fn credit(&mut self, account: &AccountId, amount: u128) -> Result<(), EscrowError> {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(EscrowError::MathOverflow)?;
        Ok(())
    }

    fn emit(&mut self, at: Timestamp, event: EscrowEvent) {
        let sequence = self.events.len() as u64;
        self.events.push(EventRecord {
            sequence,
            at,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use prover::{commit, Blinding, Fr, TargetId, VerificationKeyId, Witness, PROOF_BYTES};

    const VK: VerificationKeyId = VerificationKeyId([7u8; 32]);
    const TARGET: TargetId = TargetId([1u8; 32]);
    const VALID: u8 = 1;
    const INVALID: u8 = 0;

    /// Accepts artifacts whose proof bytes start with `VALID`
    struct StubVerifier;

    impl ProofVerifier for StubVerifier {
        fn verify(&self, artifact: &ProofArtifact, expected: &PublicInputs) -> bool {
            artifact.public_inputs == *expected && artifact.proof_bytes[0] == VALID
        }

        fn knows(&self, id: &VerificationKeyId) -> bool {
            *id == VK
        }
    }

    fn owner() -> AccountId {
        AccountId::new("owner")
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    fn terms() -> ProgramTerms {
        ProgramTerms {
            target: TARGET,
            threshold_loss: 50,
            claim_window: 100,
            reveal_window: 50,
            verification_key_id: VK,
            min_bond: 10,
            expires_at: None,
        }
    }

    fn escrow() -> Escrow {
        Escrow::new(EscrowConfig::default(), Arc::new(StubVerifier))
    }

    fn hash(n: u64) -> CommitmentHash {
        CommitmentHash::from_field(Fr::from(n))
    }

    fn artifact_for(escrow: &Escrow, claim_id: ClaimId, mark: u8) -> Vec<u8> {
        let claim = escrow.claim(claim_id).unwrap();
        ProofArtifact {
            public_inputs: claim.public_inputs,
            proof_bytes: [mark; PROOF_BYTES],
            verification_key_id: VK,
        }
        .to_bytes()
    }

    fn funded(escrow: &mut Escrow, funds: u128) -> ProgramId {
        escrow.create_program(0, owner(), terms(), funds).unwrap()
    }

    /// Program with one paid claim; returns the opening used for its commitment
    fn paid_claim(escrow: &mut Escrow) -> (ProgramId, ClaimId, Witness, Blinding) {
        let program = funded(escrow, 1_000);
        let witness = Witness::new(TARGET, 100, 0, vec![1, 2, 3, 4]).unwrap();
        let blinding = Blinding::from_field(Fr::from(99u64));
        let claim = escrow
            .submit_commitment(1, alice(), program, commit(&witness, &blinding), 10)
            .unwrap();
        let bytes = artifact_for(escrow, claim, VALID);
        assert_eq!(
            escrow.submit_proof(2, &alice(), claim, &bytes),
            Ok(ClaimOutcome::Verified { payout: 1_000 })
        );
        (program, claim, witness, blinding)
    }

    #[test]
    fn test_create_program_validation() {
        let mut escrow = escrow();
        assert_eq!(
            escrow.create_program(0, owner(), terms(), 0),
            Err(EscrowError::ZeroFunds)
        );

        let mut unknown_key = terms();
        unknown_key.verification_key_id = VerificationKeyId([8u8; 32]);
        assert_eq!(
            escrow.create_program(0, owner(), unknown_key, 10),
            Err(EscrowError::UnknownVerificationKey)
        );

        let mut no_window = terms();
        no_window.reveal_window = 0;
        assert_matches!(
            escrow.create_program(0, owner(), no_window, 10),
            Err(EscrowError::InvalidTerms(_))
        );

        let mut stale = terms();
        stale.expires_at = Some(5);
        assert_matches!(
            escrow.create_program(5, owner(), stale, 10),
            Err(EscrowError::InvalidTerms(_))
        );

        assert!(escrow.events().is_empty());
        assert_eq!(escrow.locked(), 0);

        let id = funded(&mut escrow, 500);
        let program = escrow.program(id).unwrap();
        assert_eq!(program.status, ProgramStatus::Funded);
        assert_eq!(program.funds_locked, 500);
        assert_eq!(escrow.locked(), 500);
    }

    #[test]
    fn test_commitment_bond_and_uniqueness() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);

        assert_eq!(
            escrow.submit_commitment(1, alice(), program, hash(1), 9),
            Err(EscrowError::BondTooLow {
                required: 10,
                offered: 9
            })
        );

        let claim = escrow
            .submit_commitment(1, alice(), program, hash(1), 10)
            .unwrap();
        let recorded = escrow.claim(claim).unwrap();
        assert_eq!(recorded.status, ClaimStatus::ClaimOpen);
        assert_eq!(recorded.claim_deadline, 101);
        assert_eq!(recorded.public_inputs.threshold_loss, 50);
        assert_eq!(recorded.public_inputs.commitment, hash(1));

        assert_eq!(
            escrow.submit_commitment(2, bob(), program, hash(1), 10),
            Err(EscrowError::DuplicateCommitment)
        );

        // Once the first claim is terminal only its claimant may record the hash again
        escrow
            .trigger_timeout(101, TimeoutTarget::Claim(claim))
            .unwrap();
        assert_eq!(
            escrow.submit_commitment(102, bob(), program, hash(1), 10),
            Err(EscrowError::DuplicateCommitment)
        );
        assert!(escrow
            .submit_commitment(102, alice(), program, hash(1), 10)
            .is_ok());
    }

    #[test]
    fn test_expired_claim_artifact_cannot_be_replayed_by_another_claimant() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let leaked = artifact_for(&escrow, claim, VALID);
        assert_eq!(
            escrow.submit_proof(101, &alice(), claim, &leaked),
            Err(EscrowError::ClaimWindowElapsed)
        );
        escrow
            .trigger_timeout(101, TimeoutTarget::Claim(claim))
            .unwrap();

        let events = escrow.events().len();
        assert_eq!(
            escrow.submit_commitment(102, AccountId::new("mallory"), program, hash(1), 10),
            Err(EscrowError::DuplicateCommitment)
        );
        assert_eq!(escrow.events().len(), events);
        assert_eq!(escrow.balance(&AccountId::new("mallory")), 0);
        assert_eq!(escrow.program(program).unwrap().funds_locked, 1_000);
    }

    #[test]
    fn test_escrow_min_bond_applies_over_program_terms() {
        let config = EscrowConfig {
            min_bond: 25,
            ..EscrowConfig::default()
        };
        let mut escrow = Escrow::new(config, Arc::new(StubVerifier));
        let program = funded(&mut escrow, 1_000);
        assert_eq!(
            escrow.submit_commitment(1, alice(), program, hash(1), 10),
            Err(EscrowError::BondTooLow {
                required: 25,
                offered: 10
            })
        );
    }

    #[test]
    fn test_open_claim_limit() {
        let config = EscrowConfig {
            max_open_claims_per_program: 2,
            ..EscrowConfig::default()
        };
        let mut escrow = Escrow::new(config, Arc::new(StubVerifier));
        let program = funded(&mut escrow, 1_000);
        escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        escrow.submit_commitment(1, bob(), program, hash(2), 10).unwrap();
        assert_eq!(
            escrow.submit_commitment(1, alice(), program, hash(3), 10),
            Err(EscrowError::TooManyOpenClaims { max: 2 })
        );
    }

    #[test]
    fn test_unknown_commitment_is_rejected_without_state_change() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let events_before = escrow.events().len();

        let forged = ProofArtifact {
            public_inputs: PublicInputs::new(program, TARGET, 50, hash(404)),
            proof_bytes: [VALID; PROOF_BYTES],
            verification_key_id: VK,
        };
        assert_eq!(
            escrow.submit_proof(2, &alice(), claim, &forged.to_bytes()),
            Err(EscrowError::UnknownCommitment)
        );
        assert_eq!(escrow.events().len(), events_before);
        assert_eq!(escrow.claim(claim).unwrap().status, ClaimStatus::ClaimOpen);
    }

    #[test]
    fn test_commitment_mismatch() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let a = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let b = escrow.submit_commitment(1, bob(), program, hash(2), 10).unwrap();

        // Bob submits alice's statement against his own claim
        let alices = artifact_for(&escrow, a, VALID);
        assert_eq!(
            escrow.submit_proof(2, &bob(), b, &alices),
            Err(EscrowError::CommitmentMismatch)
        );
        // Bob submits alice's artifact against alice's claim
        assert_eq!(
            escrow.submit_proof(2, &bob(), a, &alices),
            Err(EscrowError::CommitmentMismatch)
        );
        assert_eq!(escrow.program(program).unwrap().status, ProgramStatus::Funded);
    }

    #[test]
    fn test_rejections_allow_retry_before_deadline() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();

        assert_eq!(
            escrow.submit_proof(2, &alice(), claim, &[1, 1, 0]),
            Ok(ClaimOutcome::Rejected(RejectionReason::MalformedArtifact))
        );
        assert_eq!(escrow.claim(claim).unwrap().status, ClaimStatus::ProofSubmitted);

        let bad = artifact_for(&escrow, claim, INVALID);
        assert_eq!(
            escrow.submit_proof(3, &alice(), claim, &bad),
            Ok(ClaimOutcome::Rejected(RejectionReason::ProofInvalid))
        );

        let mut lowered = ProofArtifact::from_bytes(&artifact_for(&escrow, claim, VALID)).unwrap();
        lowered.public_inputs.threshold_loss = 1;
        assert_eq!(
            escrow.submit_proof(4, &alice(), claim, &lowered.to_bytes()),
            Ok(ClaimOutcome::Rejected(RejectionReason::PublicInputsMismatch))
        );

        let mut other_key = ProofArtifact::from_bytes(&artifact_for(&escrow, claim, VALID)).unwrap();
        other_key.verification_key_id = VerificationKeyId([9u8; 32]);
        assert_eq!(
            escrow.submit_proof(5, &alice(), claim, &other_key.to_bytes()),
            Ok(ClaimOutcome::Rejected(RejectionReason::ProofInvalid))
        );

        let stored = escrow.claim(claim).unwrap();
        assert_eq!(stored.rejected_proofs, 4);
        assert!(stored.proof_artifact.is_none());
        assert_eq!(escrow.program(program).unwrap().funds_locked, 1_000);

        let good = artifact_for(&escrow, claim, VALID);
        assert_eq!(
            escrow.submit_proof(6, &alice(), claim, &good),
            Ok(ClaimOutcome::Verified { payout: 1_000 })
        );
    }

    #[test]
    fn test_proof_after_claim_window() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let good = artifact_for(&escrow, claim, VALID);
        assert_eq!(
            escrow.submit_proof(101, &alice(), claim, &good),
            Err(EscrowError::ClaimWindowElapsed)
        );
    }

    #[test]
    fn test_first_valid_proof_wins_and_supersedes_rivals() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let a = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let b = escrow.submit_commitment(1, bob(), program, hash(2), 15).unwrap();
        let bobs = artifact_for(&escrow, b, VALID);

        let alices = artifact_for(&escrow, a, VALID);
        assert_eq!(
            escrow.submit_proof(5, &alice(), a, &alices),
            Ok(ClaimOutcome::Verified { payout: 1_000 })
        );

        let winner = escrow.claim(a).unwrap();
        assert_eq!(winner.status, ClaimStatus::RevealWindow);
        assert_eq!(winner.payout, 1_000);
        assert_eq!(winner.reveal_deadline, Some(55));
        assert!(winner.proof_artifact.is_some());

        let loser = escrow.claim(b).unwrap();
        assert_eq!(loser.status, ClaimStatus::Superseded);
        assert_eq!(escrow.balance(&bob()), 15);
        assert_eq!(escrow.balance(&alice()), 1_000);

        let program_state = escrow.program(program).unwrap();
        assert_eq!(program_state.status, ProgramStatus::Awarded(a));
        assert_eq!(program_state.funds_locked, 0);

        // Later submissions on the superseded claim change nothing
        assert_eq!(escrow.submit_proof(6, &bob(), b, &bobs), Ok(ClaimOutcome::Superseded));
        assert_eq!(escrow.submit_proof(6, &bob(), b, &[0u8; 3]), Ok(ClaimOutcome::Superseded));
        assert_eq!(escrow.balance(&bob()), 15);

        let kinds: Vec<&str> = escrow
            .events()
            .iter()
            .map(|r| match r.event {
                EscrowEvent::ProofVerified { .. } => "verified",
                EscrowEvent::ClaimSuperseded { .. } => "superseded",
                EscrowEvent::Paid { .. } => "paid",
                _ => "other",
            })
            .filter(|k| *k != "other")
            .collect();
        assert_eq!(kinds, vec!["verified", "superseded", "paid"]);
    }

    #[test]
    fn test_payout_overflow_leaves_claim_untouched() {
        let mut escrow = escrow();
        let rich = funded(&mut escrow, u128::MAX - 20);
        let first = escrow.submit_commitment(1, alice(), rich, hash(1), 10).unwrap();
        let bytes = artifact_for(&escrow, first, VALID);
        escrow.submit_proof(2, &alice(), first, &bytes).unwrap();

        let program = funded(&mut escrow, 100);
        let claim = escrow.submit_commitment(3, alice(), program, hash(2), 10).unwrap();
        let bytes = artifact_for(&escrow, claim, VALID);
        let (events, locked) = (escrow.events().len(), escrow.locked());

        assert_eq!(
            escrow.submit_proof(4, &alice(), claim, &bytes),
            Err(EscrowError::MathOverflow)
        );
        let untouched = escrow.claim(claim).unwrap();
        assert_eq!(untouched.status, ClaimStatus::ClaimOpen);
        assert!(untouched.proof_artifact.is_none());
        assert_eq!(escrow.events().len(), events);
        assert_eq!(escrow.locked(), locked);
        assert_eq!(escrow.program(program).unwrap().status, ProgramStatus::Funded);
    }

    #[test]
    fn test_superseded_commitment_is_unknown_elsewhere() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let a = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let b = escrow.submit_commitment(1, bob(), program, hash(2), 10).unwrap();
        let bobs = artifact_for(&escrow, b, VALID);
        let alices = artifact_for(&escrow, a, VALID);
        escrow.submit_proof(2, &alice(), a, &alices).unwrap();

        assert_eq!(
            escrow.submit_proof(3, &alice(), a, &bobs),
            Err(EscrowError::UnknownCommitment)
        );
    }

    #[test]
    fn test_reveal_closes_and_refunds_bond() {
        let mut escrow = escrow();
        let (program, claim, witness, blinding) = paid_claim(&mut escrow);

        // The claimant's exact opening closes the claim
        assert_eq!(
            escrow.reveal(10, &alice(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Ok(RevealOutcome::Closed)
        );
        let closed = escrow.claim(claim).unwrap();
        assert_eq!(closed.status, ClaimStatus::Closed);
        assert_eq!(closed.reveal.as_ref().unwrap().revealed_at, 10);
        assert_eq!(escrow.balance(&alice()), 1_010);
        assert_eq!(escrow.program(program).unwrap().forfeited_bonds, 0);
        assert_eq!(escrow.locked(), 0);

        assert_eq!(
            escrow.reveal(11, &alice(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Err(EscrowError::AlreadyRevealed)
        );
    }

    #[test]
    fn test_only_the_claimant_may_reveal() {
        let mut escrow = escrow();
        let (program, claim, witness, blinding) = paid_claim(&mut escrow);
        let events = escrow.events().len();

        assert_eq!(
            escrow.reveal(3, &owner(), claim, vec![0], vec![]),
            Err(EscrowError::Unauthorized)
        );
        assert_eq!(
            escrow.reveal(3, &bob(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Err(EscrowError::Unauthorized)
        );
        let untouched = escrow.claim(claim).unwrap();
        assert_eq!(untouched.status, ClaimStatus::RevealWindow);
        assert!(untouched.reveal.is_none());
        assert_eq!(escrow.events().len(), events);
        assert_eq!(escrow.balance(&owner()), 0);

        assert_eq!(
            escrow.reveal(4, &alice(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Ok(RevealOutcome::Closed)
        );
        assert_eq!(escrow.balance(&alice()), 1_010);
        assert_eq!(escrow.program(program).unwrap().forfeited_bonds, 0);
    }

    #[test]
    fn test_mismatched_reveal_slashes_but_keeps_payout() {
        let mut escrow = escrow();
        let (program, claim, witness, blinding) = paid_claim(&mut escrow);

        let mut tampered = witness.to_bytes();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert_eq!(
            escrow.reveal(10, &alice(), claim, tampered, blinding.to_bytes().to_vec()),
            Ok(RevealOutcome::Mismatch)
        );

        let slashed = escrow.claim(claim).unwrap();
        assert_eq!(slashed.status, ClaimStatus::Slashed);
        assert_eq!(escrow.balance(&alice()), 1_000);
        assert_eq!(escrow.balance(&owner()), 10);
        assert_eq!(escrow.program(program).unwrap().forfeited_bonds, 10);
        assert_matches!(
            escrow.events().last().map(|r| &r.event),
            Some(EscrowEvent::Slashed {
                reason: SlashReason::RevealMismatch,
                bond_forfeited: 10,
                ..
            })
        );

        assert_eq!(
            escrow.reveal(11, &alice(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Err(EscrowError::AlreadyRevealed)
        );
    }

    #[test]
    fn test_reveal_window_boundaries() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        assert_matches!(
            escrow.reveal(2, &alice(), claim, vec![], vec![]),
            Err(EscrowError::InvalidTransition { .. })
        );

        let mut escrow = self::escrow();
        let (_, claim, witness, blinding) = paid_claim(&mut escrow);
        // Paid at t=2 with a 50s window
        assert_eq!(
            escrow.reveal(52, &alice(), claim, witness.to_bytes(), blinding.to_bytes().to_vec()),
            Err(EscrowError::RevealWindowElapsed)
        );
        assert_eq!(escrow.claim(claim).unwrap().status, ClaimStatus::RevealWindow);
    }

    #[test]
    fn test_claim_timeout_is_monotonic() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();

        for now in [1, 50, 100] {
            assert_eq!(
                escrow.trigger_timeout(now, TimeoutTarget::Claim(claim)),
                Err(EscrowError::TimeoutNotReached { deadline: 101, now })
            );
        }
        assert_eq!(
            escrow.trigger_timeout(500, TimeoutTarget::Claim(claim)),
            Ok(TimeoutOutcome::ClaimExpired {
                claim_id: claim,
                bond_refunded: 10
            })
        );
        assert_eq!(escrow.balance(&alice()), 10);
        // Program keeps accepting claims
        assert_eq!(escrow.program(program).unwrap().status, ProgramStatus::Funded);
        assert!(escrow.submit_commitment(501, bob(), program, hash(2), 10).is_ok());
        assert_matches!(
            escrow.trigger_timeout(600, TimeoutTarget::Claim(claim)),
            Err(EscrowError::InvalidTransition { .. })
        );
    }

    #[test]
    fn test_proof_verified_before_deadline_is_not_overridden_by_timeout() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 1_000);
        let claim = escrow.submit_commitment(1, alice(), program, hash(1), 10).unwrap();
        let rival = escrow.submit_commitment(1, bob(), program, hash(2), 10).unwrap();
        let deadline = escrow.claim(claim).unwrap().claim_deadline;

        let bytes = artifact_for(&escrow, claim, VALID);
        assert_eq!(
            escrow.submit_proof(deadline - 1, &alice(), claim, &bytes),
            Ok(ClaimOutcome::Verified { payout: 1_000 })
        );
        let balances = (escrow.balance(&alice()), escrow.balance(&bob()), escrow.locked());

        // Past the claim window only the reveal deadline can fire
        assert_eq!(
            escrow.trigger_timeout(deadline, TimeoutTarget::Claim(claim)),
            Err(EscrowError::TimeoutNotReached {
                deadline: deadline - 1 + 50,
                now: deadline
            })
        );
        assert_matches!(
            escrow.trigger_timeout(deadline, TimeoutTarget::Claim(rival)),
            Err(EscrowError::InvalidTransition { .. })
        );

        assert_eq!(escrow.claim(claim).unwrap().status, ClaimStatus::RevealWindow);
        assert_eq!(escrow.claim(rival).unwrap().status, ClaimStatus::Superseded);
        assert_eq!(
            escrow.program(program).unwrap().status,
            ProgramStatus::Awarded(claim)
        );
        assert_eq!(
            (escrow.balance(&alice()), escrow.balance(&bob()), escrow.locked()),
            balances
        );
    }

    #[test]
    fn test_missing_reveal_is_slashed() {
        let mut escrow = escrow();
        let (program, claim, _, _) = paid_claim(&mut escrow);
        assert_matches!(
            escrow.trigger_timeout(51, TimeoutTarget::Claim(claim)),
            Err(EscrowError::TimeoutNotReached { deadline: 52, .. })
        );
        assert_eq!(
            escrow.trigger_timeout(52, TimeoutTarget::Claim(claim)),
            Ok(TimeoutOutcome::ClaimSlashed {
                claim_id: claim,
                bond_forfeited: 10
            })
        );
        assert_eq!(escrow.claim(claim).unwrap().status, ClaimStatus::Slashed);
        assert_eq!(escrow.balance(&alice()), 1_000);
        assert_eq!(escrow.program(program).unwrap().forfeited_bonds, 10);
    }

    #[test]
    fn test_program_expiry_refunds_everyone() {
        let mut escrow = escrow();
        let mut expiring = terms();
        expiring.expires_at = Some(1_000);
        let program = escrow.create_program(0, owner(), expiring, 800).unwrap();
        let a = escrow.submit_commitment(10, alice(), program, hash(1), 10).unwrap();
        let b = escrow.submit_commitment(20, bob(), program, hash(2), 20).unwrap();

        assert_matches!(
            escrow.trigger_timeout(999, TimeoutTarget::Program(program)),
            Err(EscrowError::TimeoutNotReached { deadline: 1_000, .. })
        );
        assert_eq!(
            escrow.submit_commitment(1_000, alice(), program, hash(3), 10),
            Err(EscrowError::ProgramExpired(program))
        );
        assert_eq!(
            escrow.trigger_timeout(1_000, TimeoutTarget::Program(program)),
            Ok(TimeoutOutcome::ProgramExpired {
                program_id: program,
                refunded: 800,
                claims_expired: vec![a, b],
            })
        );
        assert_eq!(escrow.balance(&owner()), 800);
        assert_eq!(escrow.balance(&alice()), 10);
        assert_eq!(escrow.balance(&bob()), 20);
        assert_eq!(escrow.locked(), 0);
        assert_eq!(escrow.program(program).unwrap().status, ProgramStatus::Expired);

        assert_matches!(
            escrow.trigger_timeout(2_000, TimeoutTarget::Program(program)),
            Err(EscrowError::ProgramNotFunded { .. })
        );
    }

    #[test]
    fn test_program_without_expiry_cannot_time_out() {
        let mut escrow = escrow();
        let program = funded(&mut escrow, 100);
        assert_eq!(
            escrow.trigger_timeout(u64::MAX, TimeoutTarget::Program(program)),
            Err(EscrowError::NoProgramExpiry(program))
        );
    }

    #[test]
    fn test_cancel_program() {
        let mut escrow = escrow();
        let untouched = funded(&mut escrow, 300);
        assert_eq!(
            escrow.cancel_program(1, &alice(), untouched),
            Err(EscrowError::Unauthorized)
        );
        assert_eq!(escrow.cancel_program(1, &owner(), untouched), Ok(untouched));
        assert_eq!(escrow.balance(&owner()), 300);
        assert_eq!(
            escrow.program(untouched).unwrap().status,
            ProgramStatus::Cancelled
        );

        let claimed = funded(&mut escrow, 300);
        let claim = escrow.submit_commitment(2, alice(), claimed, hash(1), 10).unwrap();
        escrow.trigger_timeout(200, TimeoutTarget::Claim(claim)).unwrap();
        // A commitment was recorded once, even though it has since expired
        assert_eq!(
            escrow.cancel_program(201, &owner(), claimed),
            Err(EscrowError::CancelNotAllowed)
        );
    }

    #[test]
    fn test_custody_is_conserved() {
        let mut escrow = escrow();
        let (_, claim, _, _) = paid_claim(&mut escrow);
        let program = funded(&mut escrow, 700);
        let c = escrow.submit_commitment(3, bob(), program, hash(5), 30).unwrap();
        escrow.trigger_timeout(52, TimeoutTarget::Claim(claim)).unwrap();
        escrow.trigger_timeout(200, TimeoutTarget::Claim(c)).unwrap();

        let deposited = 1_000 + 10 + 700 + 30;
        let released: u128 = [owner(), alice(), bob()]
            .iter()
            .map(|a| escrow.balance(a))
            .sum();
        assert_eq!(released + escrow.locked(), deposited);
        assert_eq!(escrow.locked(), 700);
    }

    #[test]
    fn test_apply_dispatches_and_logs_events() {
        let mut escrow = escrow();
        let receipt = escrow.apply(
            0,
            Command::CreateProgram {
                owner: owner(),
                terms: terms(),
                funds: 100,
            },
        );
        assert_eq!(receipt, Ok(Receipt::ProgramCreated(ProgramId(0))));
        let receipt = escrow.apply(
            1,
            Command::SubmitCommitment {
                claimant: alice(),
                program_id: ProgramId(0),
                commitment: hash(1),
                bond: 10,
            },
        );
        assert_eq!(receipt, Ok(Receipt::CommitmentRecorded(ClaimId(0))));
        assert_eq!(escrow.events().len(), 2);
        assert_eq!(escrow.events_since(1).len(), 1);
        assert_eq!(escrow.events_since(9).len(), 0);
        assert_eq!(escrow.events()[1].sequence, 1);
        assert_eq!(escrow.events()[1].at, 1);
    }
}
