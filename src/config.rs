//! Interpreter configuration
//!
//! Loaded from JSON or from `JSCALL_*` environment variables. Every field has
//! a default, so partial documents are accepted.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which body evaluator runs function bodies.
///
/// This is a process-wide switch held by the interpreter, not a per-function
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationStrategy {
    /// Walk the AST directly. Supports async bodies, rejects generators.
    #[default]
    TreeWalking,
    /// Compile bodies to register bytecode once per closure. Supports
    /// generators, rejects async bodies.
    Compiled,
}

impl FromStr for EvaluationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree-walking" | "tree" | "ast" => Ok(EvaluationStrategy::TreeWalking),
            "compiled" | "bytecode" => Ok(EvaluationStrategy::Compiled),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: EvaluationStrategy,
    /// Execution contexts allowed on the stack before a RangeError
    pub max_call_depth: usize,
    /// Log every executable as JSON when it is first compiled
    pub dump_bytecode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: EvaluationStrategy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            dump_bytecode: false,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `JSCALL_STRATEGY`, `JSCALL_MAX_CALL_DEPTH` and
    /// `JSCALL_DUMP_BYTECODE`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(strategy) = lookup("JSCALL_STRATEGY") {
            config.strategy = strategy.parse()?;
        }
        if let Some(depth) = lookup("JSCALL_MAX_CALL_DEPTH") {
            config.max_call_depth =
                depth
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidVariable {
                        variable: "JSCALL_MAX_CALL_DEPTH",
                        value: depth.clone(),
                    })?;
        }
        if let Some(dump) = lookup("JSCALL_DUMP_BYTECODE") {
            config.dump_bytecode = matches!(dump.trim(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
