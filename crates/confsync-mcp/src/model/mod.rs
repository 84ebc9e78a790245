//! Domain types: canonical models, config entries, targets and naming.

pub mod naming;
pub mod types;

pub use naming::*;
pub use types::*;
