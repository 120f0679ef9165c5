mod nd_cache;
mod pending;

pub use nd_cache::*;
pub use pending::*;
