#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod config;
mod error;
mod guard;
mod handle;
mod pool;
mod pool_allocator;
mod storage;

pub use config::*;
pub use error::*;
pub use guard::*;
pub use handle::*;
pub use pool::*;
pub use pool_allocator::*;
