//! CLI command handling

pub mod output;
pub mod registry;
pub mod route;
pub mod simulate;

pub use output::*;
pub use registry::*;
pub use route::*;
pub use simulate::*;
