#[allow(clippy::module_inception)]
mod config;
mod error;

pub use config::*;
pub use error::*;
