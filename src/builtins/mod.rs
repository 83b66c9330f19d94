// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod collections;
#[cfg(feature = "base64")]
pub mod encoding;
pub mod methods;
pub mod principal;
pub mod strings;
pub mod time;
pub mod utils;

use crate::ast::{Expr, Ref};
use crate::clock::Clock;
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;

/// What a builtin may observe besides its arguments.
pub struct BuiltinEnv<'a> {
    pub context: &'a Value,
    pub clock: &'a dyn Clock,
}

/// A builtin and the largest number of arguments it accepts.
pub type BuiltinFcn = (
    fn(&Span, &[Ref<Expr>], &[Value], &BuiltinEnv<'_>) -> Result<Value>,
    u8,
);

#[rustfmt::skip]
lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, BuiltinFcn> = {
	let mut m : HashMap<&'static str, BuiltinFcn>  = HashMap::new();

	principal::register(&mut m);
	collections::register(&mut m);
	strings::register(&mut m);
	#[cfg(feature = "base64")]
	encoding::register(&mut m);
	time::register(&mut m);

	m
    };
}

pub fn lookup(name: &str) -> Option<&'static BuiltinFcn> {
    BUILTINS.get(name)
}
