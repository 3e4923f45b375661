//! Data models for the book topic taxonomy.

mod assignment;
mod revision;
mod topic;
mod tree;

pub use assignment::*;
pub use revision::*;
pub use topic::*;
pub use tree::*;
