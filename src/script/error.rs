// ABOUTME: Error types for the sandboxed script engine
// ABOUTME: Distinguishes syntax, evaluation, type and abort failures

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Script syntax error: {0}")]
    Syntax(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Condition must evaluate to a boolean, got {found}")]
    NotBoolean { found: String },

    #[error("Script result could not be converted: {0}")]
    Conversion(String),

    #[error("Script execution aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, ScriptError>;
