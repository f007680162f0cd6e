// Exploit bounty verifier
// Groth16 (BN254) verification of proof artifacts against a program's
// expected public inputs. Every failure path answers `false`.

pub mod groth16;

use groth16::{check_artifact, PreparedKey};
use prover::{KeyError, ProofArtifact, PublicInputs, VerificationKey, VerificationKeyId};
use std::collections::HashMap;
use tracing::{debug, info};

pub use groth16::VerificationError;

/// Seam between the escrow and the proof system
pub trait ProofVerifier: Send + Sync {
    /// Accept iff the artifact proves the statement `expected` under its named key
    fn verify(&self, artifact: &ProofArtifact, expected: &PublicInputs) -> bool;

    /// Whether programs may reference this key
    fn knows(&self, id: &VerificationKeyId) -> bool;
}

/// Verify an artifact against a single key, failing closed
pub fn verify(artifact: &ProofArtifact, expected: &PublicInputs, vk: &VerificationKey) -> bool {
    verify_prepared(artifact, expected, &PreparedKey::new(vk))
}

fn verify_prepared(artifact: &ProofArtifact, expected: &PublicInputs, key: &PreparedKey) -> bool {
    match check_artifact(artifact, expected, key) {
        Ok(true) => true,
        Ok(false) => {
            debug!(program = %expected.program_id, "Pairing check failed");
            false
        }
        Err(e) => {
            debug!(program = %expected.program_id, error = %e, "Artifact rejected");
            false
        }
    }
}

/// Verification keys by id, prepared once at registration
#[derive(Default)]
pub struct KeyRegistry {
    keys: HashMap<VerificationKeyId, PreparedKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, vk: &VerificationKey) -> VerificationKeyId {
        let prepared = PreparedKey::new(vk);
        let id = prepared.id();
        info!(vk_id = %id, gadget = prepared.gadget(), "Registered verification key");
        self.keys.insert(id, prepared);
        id
    }

    /// Register a key from its exported record
    pub fn register_record(
        &mut self,
        gadget: &str,
        record: &[u8],
    ) -> Result<VerificationKeyId, KeyError> {
        let vk = VerificationKey::from_record(gadget, record)?;
        Ok(self.register(&vk))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ProofVerifier for KeyRegistry {
    fn verify(&self, artifact: &ProofArtifact, expected: &PublicInputs) -> bool {
        let Some(key) = self.keys.get(&artifact.verification_key_id) else {
            debug!(vk_id = %artifact.verification_key_id, "Unknown verification key");
            return false;
        };
        verify_prepared(artifact, expected, key)
    }

    fn knows(&self, id: &VerificationKeyId) -> bool {
        self.keys.contains_key(id)
    }
}
