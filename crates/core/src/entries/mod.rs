//! Time entry lifecycle domain

pub mod ports;
pub mod service;
pub mod validate;

pub use ports::*;
pub use service::*;
