// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result};
use crate::interpreter::Interpreter;

use serde::{Deserialize, Serialize};

/// Operands of an `all`, `any` or `none` combinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchList {
    #[serde(default)]
    pub of: Vec<Match>,
}

/// A boolean combinator tree whose leaves are expressions.
///
/// Exactly one field is expected per node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<MatchList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<MatchList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub none: Option<MatchList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

impl Match {
    pub fn expr(text: impl Into<String>) -> Self {
        Match {
            expr: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn all(of: Vec<Match>) -> Self {
        Match {
            all: Some(MatchList { of }),
            ..Default::default()
        }
    }

    pub fn any(of: Vec<Match>) -> Self {
        Match {
            any: Some(MatchList { of }),
            ..Default::default()
        }
    }

    pub fn none(of: Vec<Match>) -> Self {
        Match {
            none: Some(MatchList { of }),
            ..Default::default()
        }
    }
}

/// Either a match tree or a single script expression. Both absent means
/// the condition always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_: Option<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Condition {
    pub fn from_match(m: Match) -> Self {
        Condition {
            match_: Some(m),
            script: None,
        }
    }

    pub fn script(text: impl Into<String>) -> Self {
        Condition {
            match_: None,
            script: Some(text.into()),
        }
    }
}

enum Node<'m> {
    All(&'m [Match]),
    Any(&'m [Match]),
    None(&'m [Match]),
    Expr(&'m str),
}

fn classify(node: &Match) -> Result<Node<'_>> {
    let mut found = vec![];
    if let Some(l) = &node.all {
        found.push(Node::All(&l.of));
    }
    if let Some(l) = &node.any {
        found.push(Node::Any(&l.of));
    }
    if let Some(l) = &node.none {
        found.push(Node::None(&l.of));
    }
    if let Some(e) = &node.expr {
        found.push(Node::Expr(e));
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(Error::UnsupportedMatch(
            "match node has none of `all`, `any`, `none` or `expr`".to_string(),
        )),
        n => Err(Error::UnsupportedMatch(format!(
            "match node sets {n} of `all`, `any`, `none`, `expr`; expected exactly one"
        ))),
    }
}

/// Evaluate a match tree. `all` and `any` short-circuit in declared order.
pub fn evaluate_match(node: &Match, interp: &mut Interpreter) -> Result<bool> {
    match classify(node)? {
        Node::All(of) => {
            for m in of {
                if !evaluate_match(m, interp)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Node::Any(of) => any(of, interp),
        Node::None(of) => Ok(!any(of, interp)?),
        Node::Expr(text) => interp.eval_bool_str("<match>", text),
    }
}

fn any(of: &[Match], interp: &mut Interpreter) -> Result<bool> {
    for m in of {
        if evaluate_match(m, interp)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Evaluate a rule or role condition. An absent condition holds.
pub fn evaluate_condition(condition: Option<&Condition>, interp: &mut Interpreter) -> Result<bool> {
    match condition {
        Some(Condition {
            match_: Some(m), ..
        }) => evaluate_match(m, interp),
        Some(Condition {
            script: Some(s), ..
        }) => interp.eval_bool_str("<script>", s),
        _ => Ok(true),
    }
}
