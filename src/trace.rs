// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::policy::Decision;

use core::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceEvent {
    /// A rule condition held or a derived role qualified.
    Matched,
    /// A rule applied to the request but its condition did not hold.
    NotMatched,
    /// A rule, role or variable failed and was treated as not matching.
    Error,
    /// A soft failure that did not stop evaluation, such as reading a
    /// property of `undefined`.
    Diagnostic,
}

impl TraceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceEvent::Matched => "matched",
            TraceEvent::NotMatched => "not matched",
            TraceEvent::Error => "error",
            TraceEvent::Diagnostic => "diagnostic",
        }
    }
}

/// One audit record. `source` names what was evaluated, e.g.
/// `resource:doc:*#read-own`, `derivedRole:owner` or `variable:limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub source: String,
    pub event: TraceEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TraceEntry {
    pub fn new(source: impl Into<String>, event: TraceEvent) -> Self {
        Self {
            source: source.into(),
            event,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, TraceEvent::Error).with_message(message)
    }

    pub fn diagnostic(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, TraceEvent::Diagnostic).with_message(message)
    }

    pub fn is_error(&self) -> bool {
        self.event == TraceEvent::Error
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.event.as_str())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// The outcome of one evaluation call with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub decision: Decision,
    /// Matched rules as `kind:policy#rule` and qualifying derived roles as
    /// `derivedRole:name`, in evaluation order.
    pub matched: Vec<String>,
    pub trace: Vec<TraceEntry>,
}

impl Evaluation {
    pub fn errors(&self) -> impl Iterator<Item = &TraceEntry> {
        self.trace.iter().filter(|e| e.is_error())
    }
}
