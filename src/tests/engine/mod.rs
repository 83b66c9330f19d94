// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used)] // test harness asserts and unwraps to validate engine behavior

use std::collections::BTreeMap;

use crate::tests::common::{fixed_clock, init_tracing};
use crate::*;

use anyhow::{bail, Result};
use serde::Deserialize;
use test_generator::test_resources;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestCase {
    params: RequestParams,
    want_decision: Option<Decision>,
    want_actions: Option<BTreeMap<String, Decision>>,
    want_matched: Option<Vec<String>>,
    want_errors: Option<usize>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    now: Option<i64>,
    config: Option<EngineConfig>,
    #[serde(default)]
    policies: Vec<Policy>,
    #[serde(default)]
    principals: BTreeMap<String, AttributeMap>,
    #[serde(default)]
    resources: BTreeMap<String, AttributeMap>,
    #[serde(default)]
    facts: Vec<Fact>,
    #[serde(default)]
    blacklist: Vec<BlacklistEntry>,
    requests: Vec<RequestCase>,
    skip: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn engine_for(case: &TestCase) -> Result<Engine> {
    let store = MemoryStore::new();
    for policy in &case.policies {
        store.add_policy(policy.clone())?;
    }
    for (id, attrs) in &case.principals {
        store.add_principal(id.clone(), attrs.clone());
    }
    for (id, attrs) in &case.resources {
        store.add_resource(id.clone(), attrs.clone());
    }
    for fact in &case.facts {
        store.add_fact(fact.clone());
    }
    for entry in &case.blacklist {
        store.add_blacklist_entry(entry.clone());
    }
    let engine = Engine::with_memory_store(store).with_clock(fixed_clock(case.now)?);
    Ok(match &case.config {
        Some(config) => engine.with_config(config.clone())?,
        None => engine,
    })
}

async fn run_request(engine: &Engine, request: &RequestCase) -> Result<()> {
    let evaluation = engine.evaluate_with_trace(&request.params).await?;

    if let Some(want) = request.want_decision {
        if evaluation.decision != want {
            bail!(
                "expected {want}, got {}; trace: {:?}",
                evaluation.decision,
                evaluation.trace
            );
        }
    }
    if let Some(want) = &request.want_matched {
        if &evaluation.matched != want {
            bail!("expected matches {want:?}, got {:?}", evaluation.matched);
        }
    }
    if let Some(want) = request.want_errors {
        let errors: Vec<_> = evaluation.errors().collect();
        if errors.len() != want {
            bail!("expected {want} errors, got {errors:?}");
        }
    }
    if let Some(want) = &request.want_actions {
        let actual: BTreeMap<String, Decision> = engine
            .evaluate_actions(&request.params)
            .await?
            .into_iter()
            .collect();
        if &actual != want {
            bail!("expected per-action decisions {want:?}, got {actual:?}");
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    init_tracing();
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    println!("running {file}");
    for case in &test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        let engine = engine_for(case)?;
        for (idx, request) in case.requests.iter().enumerate() {
            if let Err(e) = runtime.block_on(run_request(&engine, request)) {
                panic!("case `{}` request {idx} failed: {e}", case.note);
            }
        }
        println!("passed");
    }
    Ok(())
}

#[test_resources("tests/engine/cases/*.yaml")]
fn run(path: &str) {
    yaml_test_impl(path).unwrap()
}
