//! Database implementations

pub mod entry_store;
pub mod invoice_store;
pub mod manager;
pub mod sequence;

pub use entry_store::*;
pub use invoice_store::*;
pub use manager::*;
pub use sequence::*;
