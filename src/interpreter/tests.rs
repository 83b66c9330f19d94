// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;
use crate::clock::FixedClock;

use anyhow::Result;

fn context() -> Result<Value> {
    Value::from_json_str(
        r#"{
            "P": {"id": "alice", "role": "admin", "yearsExperience": 6,
                  "tags": ["a", "b", "c"], "name": " Alice "},
            "R": {"id": "doc:1", "owner": "alice"},
            "E": {"timeOfDay": "night"}
        }"#,
    )
}

fn eval(text: &str) -> Result<Value> {
    let ctx = context()?;
    let clock = FixedClock::from_millis(1_700_000_000_000).ok_or_else(|| anyhow::anyhow!("clock"))?;
    Ok(Interpreter::new(&ctx, &clock).eval_str("<test>", text)?)
}

#[test]
fn scenario_all_conditions() -> Result<()> {
    assert_eq!(
        eval("P.yearsExperience > 5 && P.role === 'admin'")?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn missing_attributes_are_undefined() -> Result<()> {
    assert_eq!(eval("P.missing")?, Value::Undefined);
    assert_eq!(eval("P.missing.deeper")?, Value::Undefined);
    assert_eq!(eval("P.missing > 3")?, Value::Bool(false));
    assert_eq!(eval("unknownRoot")?, Value::Undefined);
    Ok(())
}

#[test]
fn member_on_undefined_is_recorded() -> Result<()> {
    let ctx = context()?;
    let mut interp = Interpreter::new(&ctx, &SystemClock);
    let v = interp.eval_str("<test>", "P.missing.deeper")?;
    assert!(v.is_undefined());
    let diagnostics = interp.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message().contains("deeper"));
    Ok(())
}

#[test]
fn logical_operators_yield_operands() -> Result<()> {
    assert_eq!(eval("P.missing || 'fallback'")?, Value::from("fallback"));
    assert_eq!(eval("0 && P.missing.x")?, Value::from(0i64));
    assert_eq!(eval("!P.missing")?, Value::Bool(true));
    Ok(())
}

#[test]
fn arithmetic_and_concatenation() -> Result<()> {
    assert_eq!(eval("1 + 2 * 3 - 4 / 2")?, Value::from(5i64));
    assert_eq!(eval("7 % 4")?, Value::from(3i64));
    assert_eq!(eval("'n=' + 3")?, Value::from("n=3"));
    assert_eq!(eval("P.missing + 1")?, Value::Undefined);
    assert!(eval("1 / 0").is_err());
    assert!(eval("true * 2").is_err());
    Ok(())
}

#[test]
fn equality() -> Result<()> {
    assert_eq!(eval("[1, 'a'] === [1, 'a']")?, Value::Bool(true));
    assert_eq!(eval("'1' === 1")?, Value::Bool(false));
    assert_eq!(eval("'1' == 1")?, Value::Bool(true));
    assert_eq!(eval("null == undefined")?, Value::Bool(true));
    assert_eq!(eval("null === undefined")?, Value::Bool(false));
    Ok(())
}

#[test]
fn membership_and_ternary() -> Result<()> {
    assert_eq!(eval("'b' in P.tags")?, Value::Bool(true));
    assert_eq!(eval("'owner' in R")?, Value::Bool(true));
    assert_eq!(eval("'x' in P.missing")?, Value::Bool(false));
    assert_eq!(eval("P.tags.length > 2 ? 'many' : 'few'")?, Value::from("many"));
    assert_eq!(eval("P.tags[0]")?, Value::from("a"));
    assert_eq!(eval("R['owner'] === P.id")?, Value::Bool(true));
    Ok(())
}

#[test]
fn methods() -> Result<()> {
    assert_eq!(eval("P.name.trim().toLowerCase()")?, Value::from("alice"));
    assert_eq!(eval("P.tags.includes('c')")?, Value::Bool(true));
    assert_eq!(eval("P.tags.join('-')")?, Value::from("a-b-c"));
    assert_eq!(eval("P.tags.indexOf('z')")?, Value::from(-1i64));
    assert!(eval("P.missing.toLowerCase()").is_err());
    assert!(eval("P.role.explode()").is_err());
    Ok(())
}

#[test]
fn quantifiers() -> Result<()> {
    assert_eq!(eval("all(P.tags, t => t.length === 1)")?, Value::Bool(true));
    assert_eq!(eval("exists(P.tags, t => t === 'b')")?, Value::Bool(true));
    assert_eq!(eval("exists_one(P.tags, t => t !== 'a')")?, Value::Bool(false));
    assert_eq!(
        eval("filter(P.tags, t => t !== 'b')")?,
        Value::from(vec![Value::from("a"), Value::from("c")])
    );
    assert_eq!(eval("size(map(P.tags, t => t + t))")?, Value::from(3i64));
    assert_eq!(eval("all(P.missing, t => true)")?, Value::Bool(false));
    assert!(eval("all(P.tags, true)").is_err());
    Ok(())
}

#[test]
fn calling_non_functions_fails() {
    assert!(eval("P.role()").is_err());
    assert!(eval("unknownFn(1)").is_err());
    assert!(eval("isIn(1)").is_err());
    assert!(eval("isAdmin(1, 2)").is_err());
}

#[test]
fn builtins_see_context_and_clock() -> Result<()> {
    assert_eq!(eval("isAdmin()")?, Value::Bool(true));
    assert_eq!(eval("now()")?, Value::from(1_700_000_000_000i64));
    assert_eq!(eval("daysSince('2023-11-13')")?, Value::from(1i64));
    assert_eq!(eval("timestamp('not a date')")?, Value::Null);
    Ok(())
}

#[test]
fn parse_errors_surface() {
    let err = eval("P.role ===").err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.starts_with("parse error"));
}
