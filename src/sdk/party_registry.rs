use std::{cmp::Ordering, collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::collections::{TypedUsize, VecMap, VecMapIter};

use super::api::{BytesVec, Culprits, ProtocolError, ProtocolResult, MAX_PARTY_COUNT};

/// Identity of a session participant.
///
/// Parties are ordered by `key`, then `id`; that order fixes every party's index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId {
    id: String,
    moniker: String,
    key: BytesVec,
}

impl PartyId {
    pub fn new(id: impl Into<String>, moniker: impl Into<String>, key: impl Into<BytesVec>) -> Self {
        Self {
            id: id.into(),
            moniker: moniker.into(),
            key: key.into(),
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn moniker(&self) -> &str {
        &self.moniker
    }
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl Ord for PartyId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.moniker.cmp(&other.moniker))
    }
}

impl PartialOrd for PartyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.id, self.moniker)
    }
}

/// The sorted, immutable list of session participants.
pub struct PartyRegistry<P> {
    parties: VecMap<P, PartyId>,
}

impl<P> PartyRegistry<P> {
    /// Sorts `parties`. Duplicate keys or ids are rejected.
    pub fn new(mut parties: Vec<PartyId>) -> ProtocolResult<Self> {
        if parties.is_empty() {
            error!("party registry must not be empty");
            return Err(ProtocolError::Fatal);
        }
        if parties.len() > MAX_PARTY_COUNT {
            error!(
                "party count {} exceeds maximum {}",
                parties.len(),
                MAX_PARTY_COUNT
            );
            return Err(ProtocolError::Fatal);
        }
        parties.sort();

        if let Some(pair) = parties.windows(2).find(|pair| pair[0].key == pair[1].key) {
            error!("duplicate party key shared by {} and {}", pair[0], pair[1]);
            return Err(ProtocolError::Fatal);
        }
        let mut ids = HashSet::with_capacity(parties.len());
        if let Some(dup) = parties.iter().find(|party| !ids.insert(party.id.as_str())) {
            error!("duplicate party id {}", dup.id);
            return Err(ProtocolError::Fatal);
        }

        Ok(Self {
            parties: VecMap::from_vec(parties),
        })
    }

    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    pub fn get(&self, index: TypedUsize<P>) -> ProtocolResult<&PartyId> {
        self.parties.get(index)
    }

    pub fn index_of(&self, party: &PartyId) -> ProtocolResult<TypedUsize<P>> {
        self.parties
            .as_slice()
            .binary_search(party)
            .map(TypedUsize::from_usize)
            .map_err(|_| {
                error!("party {} is not registered", party);
                ProtocolError::Fatal
            })
    }

    pub fn iter(&self) -> VecMapIter<P, std::slice::Iter<PartyId>> {
        self.parties.iter()
    }

    pub fn parties(&self) -> &VecMap<P, PartyId> {
        &self.parties
    }

    /// Resolve `indices` into [Culprits], preserving iteration order.
    pub fn culprits(
        &self,
        indices: impl IntoIterator<Item = TypedUsize<P>>,
    ) -> ProtocolResult<Culprits> {
        Ok(Culprits::from_vec(
            indices
                .into_iter()
                .map(|i| self.get(i).cloned())
                .collect::<ProtocolResult<_>>()?,
        ))
    }
}

impl<P> Clone for PartyRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            parties: self.parties.clone(),
        }
    }
}

impl<P> fmt::Debug for PartyRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.parties.as_slice()).finish()
    }
}
