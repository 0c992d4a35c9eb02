// The chain is split by responsibility: block structure, chain validation,
// the single-owner ledger, and a lock-based handle for concurrent callers.

pub mod block;
pub mod ledger;
pub mod shared;
pub mod validation;

pub use block::*;
pub use ledger::*;
pub use shared::*;
pub use validation::*;
