use super::TypedUsize;

/// Like [std::iter::Enumerate] but yields typed indices.
pub struct VecMapIter<K, I> {
    iter: I,
    count: TypedUsize<K>,
}

impl<K, I> VecMapIter<K, I> {
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            count: TypedUsize::from_usize(0),
        }
    }
}

impl<K, I> Iterator for VecMapIter<K, I>
where
    I: Iterator,
{
    type Item = (TypedUsize<K>, <I as Iterator>::Item);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;
        let index = self.count;
        self.count.increment();
        Some((index, item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
