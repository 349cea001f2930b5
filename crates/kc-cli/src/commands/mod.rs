//! CLI command implementations.

pub mod decode;
pub mod serve;

pub use decode::{decode_to_yaml, read_input};
pub use serve::{run_server, ServeConfig};
