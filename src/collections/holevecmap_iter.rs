use super::{vecmap_iter::VecMapIter, TypedUsize};

/// Iterates a [super::HoleVecMap], skipping over the hole index.
pub struct HoleVecMapIter<K, I> {
    iter: VecMapIter<K, I>,
    hole: TypedUsize<K>,
}

impl<K, I> HoleVecMapIter<K, I> {
    pub fn new(iter: VecMapIter<K, I>, hole: TypedUsize<K>) -> Self {
        Self { iter, hole }
    }
}

impl<K, I> Iterator for HoleVecMapIter<K, I>
where
    I: Iterator,
{
    type Item = <VecMapIter<K, I> as Iterator>::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, item) = self.iter.next()?;
        if index >= self.hole {
            return Some((TypedUsize::from_usize(index.as_usize() + 1), item));
        }
        Some((index, item))
    }
}
