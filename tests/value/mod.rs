// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use arbiter::*;

#[test]
fn json_round_trip_keeps_integers() -> Result<()> {
    let v = Value::from_json_str(r#"{"n": 3, "f": 1.5, "xs": [true, null, "s"]}"#)?;
    assert_eq!(v.to_json_str()?, r#"{"f":1.5,"n":3,"xs":[true,null,"s"]}"#);
    Ok(())
}

#[test]
fn indexing_missing_paths_is_undefined() -> Result<()> {
    let v = Value::from_json_str(r#"{"a": {"b": [1]}}"#)?;
    assert_eq!(v["a"]["b"][0], Value::from(1i64));
    assert_eq!(v["a"]["c"]["d"], Value::Undefined);
    assert_eq!(v["a"]["b"][9], Value::Undefined);
    Ok(())
}

#[test]
fn merged_is_pure() -> Result<()> {
    let base = Value::from_json_str(r#"{"a": 1, "b": 2}"#)?;
    let overlay = Value::from_json_str(r#"{"b": 3, "c": 4}"#)?;
    let merged = base.merged(&overlay)?;
    assert_eq!(merged, Value::from_json_str(r#"{"a": 1, "b": 3, "c": 4}"#)?);
    assert_eq!(base["b"], Value::from(2i64));
    assert!(base.merged(&Value::from(1i64)).is_err());
    Ok(())
}

#[test]
fn truthiness() {
    for v in [
        Value::from(false),
        Value::from(0i64),
        Value::from(f64::NAN),
        Value::from(""),
        Value::Null,
        Value::Undefined,
    ] {
        assert!(!v.is_truthy(), "{v:?}");
    }
    for v in [Value::from("0"), Value::new_array(), Value::new_object()] {
        assert!(v.is_truthy(), "{v:?}");
    }
}
