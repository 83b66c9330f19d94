// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::value::Value;

use core::{cmp, fmt, ops::Deref};
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Lt,
    Le,
    Gt,
    Ge,
    // == and !=
    LooseEq,
    LooseNe,
    // === and !==
    StrictEq,
    StrictNe,
    In,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Neg,
}

pub struct NodeRef<T> {
    r: Arc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.r).eq(&Arc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Arc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug)]
pub enum Expr {
    // Numbers, strings, booleans, null and undefined.
    Literal {
        span: Span,
        value: Value,
    },

    Array {
        span: Span,
        items: Vec<Ref<Expr>>,
    },

    // Name resolved against lambda bindings, then the context.
    Ident {
        span: Span,
        name: Arc<str>,
    },

    // a.b
    Member {
        span: Span,
        object: Ref<Expr>,
        property: Span,
    },

    // a[b]
    Index {
        span: Span,
        object: Ref<Expr>,
        index: Ref<Expr>,
    },

    Call {
        span: Span,
        fcn: Ref<Expr>,
        params: Vec<Ref<Expr>>,
    },

    // x => body. Only valid as a call argument.
    Lambda {
        span: Span,
        param: Span,
        body: Ref<Expr>,
    },

    UnaryExpr {
        span: Span,
        op: UnaryOp,
        expr: Ref<Expr>,
    },

    ArithExpr {
        span: Span,
        op: ArithOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    LogicalExpr {
        span: Span,
        op: LogicalOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Conditional {
        span: Span,
        test: Ref<Expr>,
        consequent: Ref<Expr>,
        alternate: Ref<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Literal { span, .. }
            | Array { span, .. }
            | Ident { span, .. }
            | Member { span, .. }
            | Index { span, .. }
            | Call { span, .. }
            | Lambda { span, .. }
            | UnaryExpr { span, .. }
            | ArithExpr { span, .. }
            | BoolExpr { span, .. }
            | LogicalExpr { span, .. }
            | Conditional { span, .. } => span,
        }
    }

    /// Dotted name of a callee such as `base64.encode`, if it is one.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Ident { name, .. } => Some(name.to_string()),
            Expr::Member {
                object, property, ..
            } => object
                .dotted_name()
                .map(|prefix| format!("{prefix}.{}", property.text())),
            _ => None,
        }
    }
}
