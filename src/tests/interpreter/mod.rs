// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)] // test harness asserts and unwraps to validate interpreter behavior

use std::env;

use crate::tests::common::{fixed_clock, init_tracing, match_values, process_value};
use crate::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    expr: String,
    context: Option<Value>,
    now: Option<i64>,
    max_depth: Option<usize>,
    want_result: Option<Value>,
    want_diagnostics: Option<usize>,
    error: Option<String>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let context = match &case.context {
        Some(c) => process_value(c)?,
        None => Value::new_object(),
    };
    let clock = fixed_clock(case.now)?;
    let mut interp = Interpreter::new(&context, &clock);
    if let Some(depth) = case.max_depth {
        interp = interp.with_max_depth(depth);
    }

    match (interp.eval_str("<case>", &case.expr), &case.error) {
        (Ok(actual), None) => {
            // YAML `null` deserializes as a missing value.
            let expected = match &case.want_result {
                Some(v) => process_value(v)?,
                None => Value::Null,
            };
            match_values(&actual, &expected)?;
        }
        (Ok(actual), Some(_)) => bail!("expected error, got `{actual}`"),
        (Err(e), Some(expected)) => {
            let message = e.to_string();
            if !message.contains(expected.as_str()) {
                bail!("error `{message}` does not contain `{expected}`");
            }
        }
        (Err(e), None) => return Err(e.into()),
    }

    if let Some(n) = case.want_diagnostics {
        let diagnostics = interp.take_diagnostics();
        if diagnostics.len() != n {
            bail!("expected {n} diagnostics, got {:?}", diagnostics);
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    init_tracing();
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");
    for case in &test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        if let Err(e) = run_case(case) {
            panic!("case `{}` failed: {e}", case.note);
        }
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    #[cfg(not(feature = "regex"))]
    if file.contains("regex") {
        return Ok(());
    }

    #[cfg(not(feature = "base64"))]
    if file.contains("encoding") {
        return Ok(());
    }

    yaml_test_impl(file)
}

#[test]
fn yaml_test_basic() -> Result<()> {
    yaml_test("tests/interpreter/cases/basic.yaml")
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    let mut file = String::default();

    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
        }
    }

    yaml_test(&file)
}

#[test_resources("tests/interpreter/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
