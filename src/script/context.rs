// ABOUTME: Scope construction for sandboxed condition and script evaluation
// ABOUTME: Exposes the environment and execution context as read-only object maps

use rhai::{Dynamic, Map, Scope};
use std::collections::HashMap;

/// Variables visible to an expression: `env` and `ctx`, both string maps.
#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
    env: HashMap<String, String>,
    context: HashMap<String, String>,
}

impl ScriptScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: &HashMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_context(mut self, context: &HashMap<String, String>) -> Self {
        self.context
            .extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn into_rhai(self) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push_constant("env", to_map(self.env));
        scope.push_constant("ctx", to_map(self.context));
        scope
    }
}

fn to_map(values: HashMap<String, String>) -> Map {
    values
        .into_iter()
        .map(|(key, value)| (key.into(), Dynamic::from(value)))
        .collect()
}
