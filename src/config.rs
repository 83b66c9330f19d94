// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Engine configuration.
//!
//! ```yaml
//! storeTimeoutMs: 2000
//! maxExpressionDepth: 32
//! enableTracing: true
//! ```

use crate::error::{Error, Result};
use crate::parser::DEFAULT_MAX_DEPTH;

use std::time::Duration;

use serde::{Deserialize, Serialize};

const MAX_EXPRESSION_DEPTH_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound for each store call. Default: 5000.
    pub store_timeout_ms: u64,

    /// Deepest expression nesting accepted by the parser. Default: 64.
    pub max_expression_depth: usize,

    /// Record rules that applied but did not match in the trace.
    /// Errors are always recorded.
    pub enable_tracing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5000,
            max_expression_depth: DEFAULT_MAX_DEPTH,
            enable_tracing: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(Error::config)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(Error::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_timeout_ms == 0 {
            return Err(Error::config("storeTimeoutMs must be positive"));
        }
        if !(1..=MAX_EXPRESSION_DEPTH_LIMIT).contains(&self.max_expression_depth) {
            return Err(Error::config(format!(
                "maxExpressionDepth must be between 1 and {MAX_EXPRESSION_DEPTH_LIMIT}"
            )));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
