pub mod sandbox;
pub mod script;
pub mod syntax;

pub use sandbox::{Sandbox, SandboxResult};
pub use script::{extract_inline_aobs, ScriptValidator};
pub use syntax::LuacChecker;
