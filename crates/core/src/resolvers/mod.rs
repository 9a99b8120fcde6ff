pub mod base;
pub mod factory;
pub mod object_table;
pub mod pointer_chain;
pub mod runtime_bridge;

pub use base::*;
pub use factory::{select, select_family, validation_mode};
pub use object_table::ObjectTableResolver;
pub use pointer_chain::PointerChainResolver;
pub use runtime_bridge::RuntimeBridgeResolver;
