mod connection_builder;
mod connection_handle;

pub use connection_builder::*;
pub use connection_handle::*;
