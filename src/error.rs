// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Malformed expression source or nesting beyond the configured depth.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Runtime failure while evaluating a well-formed expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for EvalError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Errors surfaced by the public API.
///
/// `Parse`, `Eval` and `UnsupportedMatch` raised while evaluating a rule or a
/// derived role are contained by the engine and recorded in the trace. Only
/// `StoreUnavailable` aborts a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("unsupported match node: {0}")]
    UnsupportedMatch(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn store_unavailable(operation: &str, reason: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable(format!("{operation}: {reason}"))
    }

    pub(crate) fn invalid_policy(reason: impl std::fmt::Display) -> Self {
        Error::InvalidPolicy(reason.to_string())
    }

    pub(crate) fn config(reason: impl std::fmt::Display) -> Self {
        Error::Config(reason.to_string())
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
