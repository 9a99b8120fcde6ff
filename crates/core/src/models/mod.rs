pub mod config;
pub mod resolution;
pub mod script;
pub mod structure;

pub use config::*;
pub use resolution::*;
pub use script::*;
pub use structure::*;
