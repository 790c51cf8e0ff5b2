// ABOUTME: Sandboxed expression and script evaluation module
// ABOUTME: Exports the rhai-backed engine used for task conditions and script tasks

pub mod context;
pub mod engine;
pub mod error;

pub use context::ScriptScope;
pub use engine::{ScriptEngine, ScriptLimits};
pub use error::ScriptError;
