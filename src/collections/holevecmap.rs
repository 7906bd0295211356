use tracing::error;

use crate::sdk::api::{ProtocolError, ProtocolResult};

use super::{holevecmap_iter::HoleVecMapIter, TypedUsize, VecMap};

/// A [VecMap] with one index (usually our own) left out.
// do not derive `Serialize`, `Deserialize`: a deserialized `hole` cannot be trusted
pub struct HoleVecMap<K, V> {
    vec: VecMap<K, V>,
    hole: TypedUsize<K>,
}

impl<K, V: std::fmt::Debug> std::fmt::Debug for HoleVecMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoleVecMap")
            .field("vec", &self.vec)
            .field("hole", &self.hole)
            .finish()
    }
}

impl<K, V: Clone> Clone for HoleVecMap<K, V> {
    fn clone(&self) -> Self {
        Self::from_vecmap(self.vec.clone(), self.hole)
    }
}

impl<K, V: PartialEq> PartialEq for HoleVecMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.hole == other.hole && self.vec == other.vec
    }
}

impl<K, V> HoleVecMap<K, V> {
    // use VecMap::remember_hole instead
    pub(super) fn from_vecmap(vec: VecMap<K, V>, hole: TypedUsize<K>) -> Self {
        Self { vec, hole }
    }

    pub fn get(&self, index: TypedUsize<K>) -> ProtocolResult<&V> {
        self.vec.get(self.map_index(index)?)
    }

    pub fn get_mut(&mut self, index: TypedUsize<K>) -> ProtocolResult<&mut V> {
        self.vec.get_mut(self.map_index(index)?)
    }

    /// never returns 0. `is_empty` returns `true` even when `len` is 1
    pub fn len(&self) -> usize {
        self.vec.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn plug_hole(self, val: V) -> VecMap<K, V> {
        let mut vec = self.vec.into_vec();
        vec.insert(self.hole.as_usize(), val);
        VecMap::from_vec(vec)
    }

    pub fn get_hole(&self) -> TypedUsize<K> {
        self.hole
    }

    pub fn iter(&self) -> HoleVecMapIter<K, std::slice::Iter<V>> {
        HoleVecMapIter::new(self.vec.iter(), self.hole)
    }

    fn map_index(&self, index: TypedUsize<K>) -> ProtocolResult<TypedUsize<K>> {
        match index.as_usize() {
            i if i < self.hole.as_usize() => Ok(index),
            i if i > self.hole.as_usize() && i <= self.vec.len() => {
                Ok(TypedUsize::from_usize(i - 1))
            }
            i if i == self.hole.as_usize() => {
                error!("attempt to index hole {}", i);
                Err(ProtocolError::Fatal)
            }
            i => {
                error!("index {} out of bounds {}", i, self.len());
                Err(ProtocolError::Fatal)
            }
        }
    }

    pub fn map<W, F>(self, f: F) -> HoleVecMap<K, W>
    where
        F: FnMut(V) -> W,
    {
        HoleVecMap::<K, W> {
            vec: self.vec.map(f),
            hole: self.hole,
        }
    }

    pub fn map2_result<W, F>(self, f: F) -> ProtocolResult<HoleVecMap<K, W>>
    where
        F: FnMut((TypedUsize<K>, V)) -> ProtocolResult<W>,
    {
        let hole = self.hole;
        Ok(HoleVecMap::<K, W>::from_vecmap(
            self.into_iter()
                .map(f)
                .collect::<ProtocolResult<VecMap<K, W>>>()?,
            hole,
        ))
    }
}

impl<K, V> IntoIterator for HoleVecMap<K, V> {
    type Item = (TypedUsize<K>, V);
    type IntoIter = HoleVecMapIter<K, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        HoleVecMapIter::new(self.vec.into_iter(), self.hole)
    }
}

impl<'a, K, V> IntoIterator for &'a HoleVecMap<K, V> {
    type Item = (TypedUsize<K>, &'a V);
    type IntoIter = HoleVecMapIter<K, std::slice::Iter<'a, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
