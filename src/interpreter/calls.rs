// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::methods::METHODS;
use crate::builtins::{self, BuiltinEnv};
use crate::error::EvalError;
use crate::lexer::Span;
use crate::value::Value;

use super::eval::Evaluator;
use super::quantifiers::Quantifier;

impl<'a> Evaluator<'a> {
    pub(super) fn eval_call(
        &mut self,
        span: &Span,
        fcn: &Expr,
        params: &[Ref<Expr>],
    ) -> Result<Value, EvalError> {
        // Registered operators are addressed by name, possibly dotted.
        if let Some(name) = fcn.dotted_name() {
            if self.lookup_variable(&name).is_none() {
                if let Some(quantifier) = Quantifier::parse(&name) {
                    return self.eval_quantifier(span, quantifier, params);
                }
                if let Some(builtin) = builtins::lookup(&name) {
                    return self.eval_builtin(span, &name, builtin, params);
                }
            }
        }

        match fcn {
            Expr::Member {
                span: member_span,
                object,
                property,
            } => {
                let receiver = self.evaluate_value(object)?;
                let method = property.text();
                if matches!(receiver, Value::Undefined | Value::Null) {
                    self.read_property(member_span, &receiver, method);
                    return Err(span.eval_error(&format!("`{method}` is not a function")));
                }
                let args = self.eval_args(params)?;
                match METHODS.get(method) {
                    Some(f) => f(span, &receiver, &args).map_err(EvalError::from),
                    None => Err(span.eval_error(&format!(
                        "`{method}` is not a function on {}",
                        receiver.type_name()
                    ))),
                }
            }
            _ => Err(span.eval_error(&format!("`{}` is not a function", fcn.span().text()))),
        }
    }

    fn eval_args(&mut self, params: &[Ref<Expr>]) -> Result<Vec<Value>, EvalError> {
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            args.push(self.evaluate_value(param)?);
        }
        Ok(args)
    }

    fn eval_builtin(
        &mut self,
        span: &Span,
        name: &str,
        builtin: &builtins::BuiltinFcn,
        params: &[Ref<Expr>],
    ) -> Result<Value, EvalError> {
        let (fcn, max_args) = builtin;
        if params.len() > usize::from(*max_args) {
            return Err(span.eval_error(&format!(
                "`{name}` expects at most {max_args} arguments, got {}",
                params.len()
            )));
        }
        let args = self.eval_args(params)?;
        let env = BuiltinEnv {
            context: self.context,
            clock: self.clock,
        };
        fcn(span, params, &args, &env).map_err(EvalError::from)
    }
}
