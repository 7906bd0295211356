use serde::{Deserialize, Serialize};
use std::iter::FromIterator;
use tracing::error;
use zeroize::Zeroize;

use crate::sdk::api::{ProtocolError, ProtocolResult};

use super::{vecmap_iter::VecMapIter, HoleVecMap, TypedUsize};

/// A `Vec` indexed by [TypedUsize]`<K>`.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "V: Serialize", deserialize = "V: Deserialize<'de>"))]
pub struct VecMap<K, V>(Vec<V>, std::marker::PhantomData<TypedUsize<K>>);

// manual impls: derive would demand the same traits from the marker `K`
impl<K, V: std::fmt::Debug> std::fmt::Debug for VecMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<K, V: Clone> Clone for VecMap<K, V> {
    fn clone(&self) -> Self {
        Self::from_vec(self.0.clone())
    }
}

impl<K, V: PartialEq> PartialEq for VecMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K, V> Zeroize for VecMap<K, V>
where
    V: Zeroize,
{
    fn zeroize(&mut self) {
        self.0.zeroize()
    }
}

impl<K, V> VecMap<K, V> {
    pub fn from_vec(vec: Vec<V>) -> Self {
        Self(vec, std::marker::PhantomData)
    }
    pub fn into_vec(self) -> Vec<V> {
        self.0
    }
    pub fn as_slice(&self) -> &[V] {
        &self.0
    }
    pub fn get(&self, index: TypedUsize<K>) -> ProtocolResult<&V> {
        self.0.get(index.as_usize()).ok_or_else(|| {
            error!("index {} out of bounds {}", index, self.0.len());
            ProtocolError::Fatal
        })
    }
    pub fn get_mut(&mut self, index: TypedUsize<K>) -> ProtocolResult<&mut V> {
        let len = self.0.len(); // fight the borrow checker
        self.0.get_mut(index.as_usize()).ok_or_else(|| {
            error!("index {} out of bounds {}", index, len);
            ProtocolError::Fatal
        })
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a [HoleVecMap] whose hole sits at `hole`.
    /// `self` must not already contain an entry for `hole`.
    pub fn remember_hole(self, hole: TypedUsize<K>) -> ProtocolResult<HoleVecMap<K, V>> {
        if hole.as_usize() > self.0.len() {
            error!("hole {} out of bounds {}", hole, self.0.len());
            return Err(ProtocolError::Fatal);
        }
        Ok(HoleVecMap::from_vecmap(self, hole))
    }

    pub fn iter(&self) -> VecMapIter<K, std::slice::Iter<V>> {
        VecMapIter::new(self.0.iter())
    }
    pub fn iter_mut(&mut self) -> VecMapIter<K, std::slice::IterMut<V>> {
        VecMapIter::new(self.0.iter_mut())
    }
    pub fn map<W, F>(self, f: F) -> VecMap<K, W>
    where
        F: FnMut(V) -> W,
    {
        VecMap::<K, W>::from_vec(self.0.into_iter().map(f).collect())
    }

    pub fn ref_map<W, F>(&self, f: F) -> VecMap<K, W>
    where
        F: FnMut(&V) -> W,
    {
        VecMap::<K, W>::from_vec(self.0.iter().map(f).collect())
    }

    pub fn map2_result<W, F>(self, f: F) -> ProtocolResult<VecMap<K, W>>
    where
        F: FnMut((TypedUsize<K>, V)) -> ProtocolResult<W>,
    {
        self.into_iter().map(f).collect()
    }
}

impl<K, V> IntoIterator for VecMap<K, V> {
    type Item = (TypedUsize<K>, V);
    type IntoIter = VecMapIter<K, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        VecMapIter::new(self.0.into_iter())
    }
}

impl<'a, K, V> IntoIterator for &'a VecMap<K, V> {
    type Item = (TypedUsize<K>, &'a V);
    type IntoIter = VecMapIter<K, std::slice::Iter<'a, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<V> for VecMap<K, V> {
    fn from_iter<Iter: IntoIterator<Item = V>>(iter: Iter) -> Self {
        Self::from_vec(Vec::from_iter(iter))
    }
}
