// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::error::EvalError;
use crate::lexer::Span;
use crate::value::Value;

use super::eval::Evaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Quantifier {
    All,
    Exists,
    ExistsOne,
    Filter,
    Map,
}

impl Quantifier {
    pub(super) fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "all" => Quantifier::All,
            "exists" => Quantifier::Exists,
            "exists_one" => Quantifier::ExistsOne,
            "filter" => Quantifier::Filter,
            "map" => Quantifier::Map,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Quantifier::All => "all",
            Quantifier::Exists => "exists",
            Quantifier::ExistsOne => "exists_one",
            Quantifier::Filter => "filter",
            Quantifier::Map => "map",
        }
    }

    // Result when the collection is missing or not an array.
    fn missing(self) -> Value {
        match self {
            Quantifier::Filter | Quantifier::Map => Value::Null,
            _ => Value::Bool(false),
        }
    }
}

impl<'a> Evaluator<'a> {
    pub(super) fn eval_quantifier(
        &mut self,
        span: &Span,
        quantifier: Quantifier,
        params: &[Ref<Expr>],
    ) -> Result<Value, EvalError> {
        let name = quantifier.name();
        if params.len() != 2 {
            return Err(span.eval_error(&format!("`{name}` expects 2 arguments")));
        }
        let Expr::Lambda { param, body, .. } = params[1].as_ref() else {
            return Err(params[1]
                .span()
                .eval_error(&format!("`{name}` expects an arrow function `x => ...`")));
        };

        let collection = self.evaluate_value(&params[0])?;
        let Value::Array(items) = collection else {
            return Ok(quantifier.missing());
        };

        let variable = param.text();
        let mut matched = 0usize;
        let mut out = vec![];
        for item in items.iter() {
            let value = self.eval_with_binding(variable, item, body)?;
            match quantifier {
                Quantifier::All if !value.is_truthy() => return Ok(Value::Bool(false)),
                Quantifier::Exists if value.is_truthy() => return Ok(Value::Bool(true)),
                Quantifier::ExistsOne if value.is_truthy() => {
                    matched += 1;
                    if matched > 1 {
                        return Ok(Value::Bool(false));
                    }
                }
                Quantifier::Filter if value.is_truthy() => out.push(item.clone()),
                Quantifier::Map => out.push(value),
                _ => (),
            }
        }

        Ok(match quantifier {
            Quantifier::All => Value::Bool(true),
            Quantifier::Exists => Value::Bool(false),
            Quantifier::ExistsOne => Value::Bool(matched == 1),
            Quantifier::Filter | Quantifier::Map => Value::from(out),
        })
    }

    fn eval_with_binding(
        &mut self,
        variable: &str,
        value: &Value,
        body: &Expr,
    ) -> Result<Value, EvalError> {
        self.push_variable(variable, value.clone());
        let result = self.evaluate_value(body);
        self.pop_variable();
        result
    }
}
