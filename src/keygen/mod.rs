mod api;
pub use api::*;

mod key_share;
mod r1;
mod r2;
mod r3;
mod r4;
mod rounds;
