// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use arbiter::*;

#[test]
fn evaluate_against_json_context() -> Result<()> {
    let context = Value::from_json_str(
        r#"{"P": {"yearsExperience": 6, "role": "admin"}, "R": {"tags": ["a", "b"]}}"#,
    )?;
    assert_eq!(
        evaluate("P.yearsExperience > 5 && P.role === 'admin'", &context)?,
        Value::from(true)
    );
    assert_eq!(evaluate("size(R.tags)", &context)?, Value::from(2i64));
    assert_eq!(evaluate("P.nickname", &context)?, Value::Undefined);
    Ok(())
}

#[test]
fn error_kinds() -> Result<()> {
    let context = Value::new_object();
    assert!(matches!(evaluate("1 +", &context), Err(Error::Parse(_))));
    assert!(matches!(evaluate("nope()", &context), Err(Error::Eval(_))));
    Ok(())
}

#[test]
fn parse_errors_point_at_the_expression() {
    let message = match evaluate("P.a &&\n  )", &Value::new_object()) {
        Err(Error::Parse(e)) => e.message().to_string(),
        other => panic!("expected parse error, got {other:?}"),
    };
    assert!(message.contains("2:3"), "{message}");
    assert!(message.contains('^'), "{message}");
}

#[test]
fn fixed_clock_makes_time_reproducible() -> Result<()> {
    let context = Value::from_json_str(r#"{"R": {"created": "2023-11-04"}}"#)?;
    let clock = FixedClock::from_millis(1_700_000_000_000).ok_or_else(|| anyhow::anyhow!("clock"))?;
    let mut first = Interpreter::new(&context, &clock);
    let mut second = Interpreter::new(&context, &clock);
    let expr = "daysSince(R.created) >= 10 ? 'stale' : 'fresh'";
    assert_eq!(first.eval_str("a", expr)?, second.eval_str("b", expr)?);
    assert_eq!(first.eval_str("a", expr)?, Value::from("stale"));
    Ok(())
}

#[test]
fn conditions_through_public_api() -> Result<()> {
    let context = Value::from_json_str(r#"{"P": {"a": true}}"#)?;
    let mut interp = Interpreter::new(&context, &SystemClock);
    let tree = Match::none(vec![Match::expr("P.b"), Match::expr("P.c")]);
    assert!(evaluate_match(&tree, &mut interp)?);
    assert!(evaluate_condition(Some(&Condition::script("P.a")), &mut interp)?);
    Ok(())
}
