use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    collections::{TypedUsize, VecMap},
    sdk::api::{BytesVec, PartyId},
};

use super::KeygenPartyId;

/// Secret key material. Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretShare(BytesVec);

impl SecretShare {
    pub fn new(bytes: BytesVec) -> Self {
        Self(bytes)
    }
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretShare([redacted])")
    }
}

/// final output of keygen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyShare {
    group: GroupPublicInfo,
    index: TypedUsize<KeygenPartyId>,
    secret: SecretShare,
}

/// `GroupPublicInfo` is the same for all parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPublicInfo {
    parties: VecMap<KeygenPartyId, PartyId>,
    threshold: usize,
    group_key: BytesVec,
    all_parties: VecMap<KeygenPartyId, PartyPublicInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPublicInfo {
    public_share: BytesVec,
    public_params: BytesVec,
}

impl KeyShare {
    pub(super) fn new(
        parties: VecMap<KeygenPartyId, PartyId>,
        index: TypedUsize<KeygenPartyId>,
        threshold: usize,
        group_key: BytesVec,
        all_parties: VecMap<KeygenPartyId, PartyPublicInfo>,
        secret: SecretShare,
    ) -> Self {
        Self {
            group: GroupPublicInfo {
                parties,
                threshold,
                group_key,
                all_parties,
            },
            index,
            secret,
        }
    }
    pub fn group(&self) -> &GroupPublicInfo {
        &self.group
    }
    pub fn index(&self) -> TypedUsize<KeygenPartyId> {
        self.index
    }
    pub fn secret(&self) -> &SecretShare {
        &self.secret
    }
}

impl GroupPublicInfo {
    pub fn parties(&self) -> &VecMap<KeygenPartyId, PartyId> {
        &self.parties
    }
    pub fn party_count(&self) -> usize {
        self.parties.len()
    }
    pub fn threshold(&self) -> usize {
        self.threshold
    }
    pub fn group_key(&self) -> &[u8] {
        &self.group_key
    }
    pub fn all_parties(&self) -> &VecMap<KeygenPartyId, PartyPublicInfo> {
        &self.all_parties
    }
}

impl PartyPublicInfo {
    pub(super) fn new(public_share: BytesVec, public_params: BytesVec) -> Self {
        Self {
            public_share,
            public_params,
        }
    }
    pub fn public_share(&self) -> &[u8] {
        &self.public_share
    }
    pub fn public_params(&self) -> &[u8] {
        &self.public_params
    }
}
