// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ari;
mod ast;
mod builtins;
mod clock;
mod condition;
mod config;
mod context;
mod derived_roles;
mod engine;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod policy;
mod store;
mod trace;
mod value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use condition::{evaluate_condition, evaluate_match, Condition, Match, MatchList};
pub use config::EngineConfig;
pub use context::{BlacklistStatus, ContextBuilder, EvaluationContext, RequestParams};
pub use derived_roles::resolve_derived_roles;
pub use engine::{decide, resolve, Engine, RuleOutcome};
pub use error::{Error, EvalError, ParseError, Result};
pub use interpreter::{evaluate, Interpreter};
pub use policy::{
    ActionRule, Decision, DerivedRoleSet, Effect, ExportedVariableSet, GroupPolicy, Policy,
    PolicyKind, PolicyVariables, PrincipalPolicy, PrincipalRule, ResourcePolicy, ResourceRule,
    RoleDef, RolePolicy,
};
pub use store::{AttributeMap, AttributeStore, BlacklistEntry, Fact, FactKind, MemoryStore, PolicyStore};
pub use trace::{Evaluation, TraceEntry, TraceEvent};
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ari::*;
    pub use crate::ast::*;
    pub use crate::context::evaluate_variables;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}

#[cfg(test)]
mod tests;
