pub mod constants;
pub mod hash;
