pub mod builder;
pub mod types;

pub use builder::{IndexBuilder, base_directory};
pub use types::*;
