// ABOUTME: Sandboxed script engine built on rhai
// ABOUTME: Evaluates task conditions and embedded scripts with resource limits and abort support

use rhai::{Dynamic, Engine, EvalAltResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::context::ScriptScope;
use super::error::{Result, ScriptError};

#[derive(Debug, Clone)]
pub struct ScriptLimits {
    pub max_operations: u64,
    /// Conditions run inline on the async worker, so they get a far smaller budget
    pub max_condition_operations: u64,
    pub max_expr_depth: usize,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: 5_000_000,
            max_condition_operations: 10_000,
            max_expr_depth: 64,
            max_call_levels: 32,
            max_string_size: 1024 * 1024,
            max_array_size: 100_000,
            max_map_size: 100_000,
        }
    }
}

/// rhai has no file, network or process access; `eval` is disabled on top of that.
#[derive(Debug, Clone, Default)]
pub struct ScriptEngine {
    limits: ScriptLimits,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    fn build(&self, abort: Option<Arc<AtomicBool>>) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.limits.max_operations);
        engine.set_max_expr_depths(self.limits.max_expr_depth, self.limits.max_expr_depth);
        engine.set_max_call_levels(self.limits.max_call_levels);
        engine.set_max_string_size(self.limits.max_string_size);
        engine.set_max_array_size(self.limits.max_array_size);
        engine.set_max_map_size(self.limits.max_map_size);
        engine.disable_symbol("eval");

        if let Some(flag) = abort {
            engine.on_progress(move |_| {
                if flag.load(Ordering::Relaxed) {
                    Some(Dynamic::UNIT)
                } else {
                    None
                }
            });
        }

        engine
    }

    /// Parse an expression without evaluating it
    pub fn check_syntax(&self, expression: &str) -> Result<()> {
        self.build(None)
            .compile_expression(expression)
            .map(|_| ())
            .map_err(|e| ScriptError::Syntax(e.to_string()))
    }

    /// Compile a full script body without running it
    pub fn check_script(&self, script: &str) -> Result<()> {
        self.build(None)
            .compile(script)
            .map(|_| ())
            .map_err(|e| ScriptError::Syntax(e.to_string()))
    }

    /// Evaluate a boolean condition against the environment
    pub fn evaluate_condition(
        &self,
        expression: &str,
        env: &HashMap<String, String>,
    ) -> Result<bool> {
        let mut engine = self.build(None);
        engine.set_max_operations(self.limits.max_condition_operations);
        let mut scope = ScriptScope::new().with_env(env).into_rhai();

        let value = engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, expression)
            .map_err(map_eval_error)?;

        value.as_bool().map_err(|found| ScriptError::NotBoolean {
            found: found.to_string(),
        })
    }

    /// Run a script body and convert its final value to JSON.
    ///
    /// Blocks the calling thread; raising `abort` stops the script at the
    /// next progress checkpoint.
    pub fn run_script(
        &self,
        script: &str,
        env: &HashMap<String, String>,
        context: &HashMap<String, String>,
        abort: Arc<AtomicBool>,
    ) -> Result<serde_json::Value> {
        let engine = self.build(Some(abort));
        let mut scope = ScriptScope::new()
            .with_env(env)
            .with_context(context)
            .into_rhai();

        let value = engine
            .eval_with_scope::<Dynamic>(&mut scope, script)
            .map_err(map_eval_error)?;

        rhai::serde::from_dynamic::<serde_json::Value>(&value)
            .map_err(|e| ScriptError::Conversion(e.to_string()))
    }
}

fn map_eval_error(error: Box<EvalAltResult>) -> ScriptError {
    match *error {
        EvalAltResult::ErrorTerminated(..) => ScriptError::Aborted,
        EvalAltResult::ErrorParsing(ref parse_error, _) => {
            ScriptError::Syntax(parse_error.to_string())
        }
        ref other => ScriptError::Evaluation(other.to_string()),
    }
}
