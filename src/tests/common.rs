// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared test utilities for YAML-based test cases

use crate::*;
use anyhow::{anyhow, Result};

/// Process test value specified in json/yaml to interpret special encodings.
pub fn process_value(v: &Value) -> Result<Value> {
    match v {
        // Handle Undefined encoded as a string "#undefined"
        Value::String(s) if s.as_ref() == "#undefined" => Ok(Value::Undefined),

        Value::Array(items) => Ok(Value::from(
            items.iter().map(process_value).collect::<Result<Vec<_>>>()?,
        )),

        Value::Object(fields) => {
            let mut object_value = std::collections::BTreeMap::new();
            for (key, value) in fields.iter() {
                object_value.insert(key.clone(), process_value(value)?);
            }
            Ok(Value::from(object_value))
        }

        // Simple variants
        _ => Ok(v.clone()),
    }
}

/// Match computed and expected values with pretty diff output
pub fn match_values(computed: &Value, expected: &Value) -> Result<()> {
    if computed != expected {
        panic!(
            "Values do not match:\nExpected: {}\nActual: {}",
            expected.to_json_str()?,
            computed.to_json_str()?
        );
    }
    Ok(())
}

/// Clock pinned to `now` milliseconds, or the shared test instant.
pub fn fixed_clock(now: Option<i64>) -> Result<FixedClock> {
    let ms = now.unwrap_or(1_700_000_000_000);
    FixedClock::from_millis(ms).ok_or_else(|| anyhow!("{ms} is not a valid instant"))
}

/// Route engine logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_test_writer();
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // Another test may already have installed it.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}
