//! Index-typed containers used to hold per-party data.
//!
//! Every container is keyed by [TypedUsize]`<K>` so that an index minted for one
//! protocol's parties cannot be used to look into another protocol's data.
mod typed_usize;
pub use typed_usize::TypedUsize;

mod vecmap;
mod vecmap_iter;
pub use vecmap::VecMap;
pub use vecmap_iter::VecMapIter;

mod holevecmap;
mod holevecmap_iter;
pub use holevecmap::HoleVecMap;
pub use holevecmap_iter::HoleVecMapIter;

mod fillholevecmap;
pub use fillholevecmap::FillHoleVecMap;
