use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::sdk::api::PartyId;

// can't derive Serialize, Deserialize for sha2::digest::Output<Sha256>
// so use [u8; 32] instead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output([u8; 32]);

impl AsRef<[u8]> for Output {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Randomness([u8; 32]);

impl std::fmt::Debug for Randomness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Randomness([redacted])")
    }
}

/// Commit to `msg` on behalf of `party` with fresh randomness.
pub fn commit(tag: u8, party: &PartyId, msg: impl AsRef<[u8]>) -> (Output, Randomness) {
    let mut randomness = Randomness([0; 32]);
    rand::thread_rng().fill_bytes(&mut randomness.0);
    (
        commit_with_randomness(tag, party, msg, &randomness),
        randomness,
    )
}

pub fn commit_with_randomness(
    tag: u8,
    party: &PartyId,
    msg: impl AsRef<[u8]>,
    randomness: &Randomness,
) -> Output {
    Output(
        Sha256::new()
            .chain_update(tag.to_be_bytes())
            .chain_update((party.key().len() as u64).to_be_bytes())
            .chain_update(party.key())
            .chain_update(msg)
            .chain_update(randomness.0)
            .finalize()
            .into(),
    )
}

/// Open `commit` with the revealed `msg` and `randomness`.
pub fn verify_commit(
    tag: u8,
    party: &PartyId,
    msg: impl AsRef<[u8]>,
    randomness: &Randomness,
    commit: &Output,
) -> bool {
    commit_with_randomness(tag, party, msg, randomness) == *commit
}
