pub mod parsing;
pub mod writer;

pub use parsing::*;
pub use writer::*;
