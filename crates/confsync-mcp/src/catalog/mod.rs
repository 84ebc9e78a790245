//! Model catalog: the ordered canonical model list plus proxy credentials.

pub mod default;
pub mod load;
pub mod types;

pub use load::*;
pub use types::*;
