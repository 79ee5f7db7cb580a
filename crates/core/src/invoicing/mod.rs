//! Invoice creation domain

pub mod builder;
pub mod ports;

pub use builder::*;
pub use ports::*;
