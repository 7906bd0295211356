//! A fillable [HoleVecMap]
use tracing::error;

use crate::sdk::api::{ProtocolError, ProtocolResult};

use super::{holevecmap_iter::HoleVecMapIter, HoleVecMap, TypedUsize, VecMap};

pub struct FillHoleVecMap<K, V> {
    hole_vec: HoleVecMap<K, Option<V>>,
    some_count: usize,
}

impl<K, V: std::fmt::Debug> std::fmt::Debug for FillHoleVecMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillHoleVecMap")
            .field("hole_vec", &self.hole_vec)
            .field("some_count", &self.some_count)
            .finish()
    }
}

impl<K, V: Clone> Clone for FillHoleVecMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            hole_vec: self.hole_vec.clone(),
            some_count: self.some_count,
        }
    }
}

impl<K, V> FillHoleVecMap<K, V> {
    pub fn with_size(len: usize, hole: TypedUsize<K>) -> ProtocolResult<Self> {
        if len == 0 {
            error!("FillHoleVecMap must have positive size");
            return Err(ProtocolError::Fatal);
        }
        Ok(Self {
            hole_vec: VecMap::from_vec((0..len - 1).map(|_| None).collect()).remember_hole(hole)?,
            some_count: 0,
        })
    }
    pub fn size(&self) -> usize {
        self.hole_vec.len()
    }
    pub fn get_hole(&self) -> TypedUsize<K> {
        self.hole_vec.get_hole()
    }
    pub fn get(&self, index: TypedUsize<K>) -> ProtocolResult<Option<&V>> {
        self.hole_vec.get(index).map(Option::as_ref)
    }
    pub fn set(&mut self, index: TypedUsize<K>, value: V) -> ProtocolResult<()> {
        let stored = self.hole_vec.get_mut(index)?;
        if stored.is_none() {
            self.some_count += 1;
        }
        *stored = Some(value);
        Ok(())
    }
    pub fn is_none(&self, index: TypedUsize<K>) -> ProtocolResult<bool> {
        Ok(self.hole_vec.get(index)?.is_none())
    }
    pub fn is_full(&self) -> bool {
        self.some_count == self.hole_vec.len() - 1
    }
    pub fn is_empty(&self) -> bool {
        self.some_count == 0
    }
    pub fn some_count(&self) -> usize {
        self.some_count
    }
    pub fn iter(&self) -> HoleVecMapIter<K, std::slice::Iter<Option<V>>> {
        self.hole_vec.iter()
    }

    /// Indices that have not been filled yet, in ascending order.
    pub fn iter_none(&self) -> impl Iterator<Item = TypedUsize<K>> + '_ {
        self.iter().filter_map(|(i, v)| v.is_none().then_some(i))
    }

    pub fn to_holevec(self) -> ProtocolResult<HoleVecMap<K, V>> {
        if !self.is_full() {
            error!("self is not full");
            return Err(ProtocolError::Fatal);
        }
        self.hole_vec
            .map2_result(|(_, x)| x.ok_or(ProtocolError::Fatal))
    }
}

impl<K, V> IntoIterator for FillHoleVecMap<K, V> {
    type Item = (TypedUsize<K>, Option<V>);
    type IntoIter = HoleVecMapIter<K, std::vec::IntoIter<Option<V>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hole_vec.into_iter()
    }
}
