// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use arbiter::*;
use async_trait::async_trait;

const POLICIES: &str = r#"
apiVersion: api.arbiter/v1
resourcePolicy:
  resource: "doc:*"
  rules:
    - name: read
      actions: [read]
      effect: ALLOW
      condition:
        match:
          expr: P.department === R.department
    - name: night-delete
      actions: [delete]
      effect: DENY
      condition:
        match:
          expr: E.timeOfDay === 'night'
    - name: delete
      actions: [delete]
      effect: ALLOW
      condition:
        script: R.owner === P.id
"#;

fn attrs(json: &str) -> Result<AttributeMap> {
    Ok(serde_json::from_str(json)?)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}

fn store() -> Result<Arc<MemoryStore>> {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.add_policy(Policy::from_yaml_str(POLICIES)?)?;
    store.add_principal("alice", attrs(r#"{"department": "eng"}"#)?);
    store.add_principal("bob", attrs(r#"{"department": "sales"}"#)?);
    store.add_resource("doc:1", attrs(r#"{"department": "eng", "owner": "alice"}"#)?);
    Ok(store)
}

fn clock() -> Result<FixedClock> {
    FixedClock::from_millis(1_700_000_000_000).ok_or_else(|| anyhow!("clock"))
}

#[tokio::test]
async fn attribute_based_decisions() -> Result<()> {
    let engine = Engine::with_memory_store(store()?).with_clock(clock()?);

    let read = RequestParams::new("alice", "doc:1", ["read"]);
    assert_eq!(engine.evaluate(&read).await?, Decision::Allow);

    let read = RequestParams::new("bob", "doc:1", ["read"]);
    assert_eq!(engine.evaluate(&read).await?, Decision::Deny);

    // The owner rule is declared after the night rule, so it wins.
    let delete = RequestParams::new("alice", "doc:1", ["delete"]).with_environment("timeOfDay", "night");
    assert_eq!(engine.evaluate(&delete).await?, Decision::Allow);
    assert_eq!(
        engine.evaluate_policies(&delete).await?,
        ["resource:doc:*#night-delete", "resource:doc:*#delete"]
    );

    let delete = RequestParams::new("bob", "doc:1", ["delete"]).with_environment("timeOfDay", "night");
    assert_eq!(engine.evaluate(&delete).await?, Decision::Deny);
    Ok(())
}

#[tokio::test]
async fn store_updates_apply_to_later_calls() -> Result<()> {
    let store = store()?;
    let engine = Engine::with_memory_store(store.clone());
    let params = RequestParams::new("bob", "doc:1", ["read"]);
    assert_eq!(engine.evaluate(&params).await?, Decision::Deny);

    store.add_policy_json(
        r#"{"apiVersion": "v1", "principalPolicy": {"principal": "bob",
            "rules": [{"resource": "doc:*", "actions": [{"action": "read", "effect": "ALLOW"}]}]}}"#,
    )?;
    assert_eq!(engine.evaluate(&params).await?, Decision::Allow);

    assert!(store.remove_policy("principal:bob"));
    assert_eq!(engine.evaluate(&params).await?, Decision::Deny);
    Ok(())
}

#[tokio::test]
async fn repeated_calls_are_deterministic() -> Result<()> {
    let store = store()?;
    store.add_policy_json(
        r#"{"apiVersion": "v1", "resourcePolicy": {"resource": "doc:*", "rules": [
            {"actions": ["archive"], "effect": "ALLOW", "condition": {"script": "getHours(now()) >= 20"}}
        ]}}"#,
    )?;
    let engine = Engine::with_memory_store(store).with_clock(clock()?);
    let params = RequestParams::new("alice", "doc:1", ["archive", "read"]);
    let first = engine.evaluate_with_trace(&params).await?;
    for _ in 0..10 {
        assert_eq!(engine.evaluate_with_trace(&params).await?, first);
    }
    assert_eq!(first.decision, Decision::Allow);
    Ok(())
}

#[tokio::test]
async fn tracing_records_non_matching_rules() -> Result<()> {
    let params = RequestParams::new("bob", "doc:1", ["read"]);

    let quiet = Engine::with_memory_store(store()?);
    assert!(quiet.evaluate_with_trace(&params).await?.trace.is_empty());

    let config = EngineConfig {
        enable_tracing: true,
        ..Default::default()
    };
    let verbose = Engine::with_memory_store(store()?).with_config(config)?;
    let evaluation = verbose.evaluate_with_trace(&params).await?;
    assert_eq!(evaluation.decision, Decision::Deny);
    assert_eq!(
        evaluation.trace,
        [TraceEntry::new("resource:doc:*#read", TraceEvent::NotMatched)]
    );
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> Result<()> {
    let config = EngineConfig {
        max_expression_depth: 0,
        ..Default::default()
    };
    assert!(matches!(
        Engine::with_memory_store(store()?).with_config(config),
        Err(Error::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn expression_depth_is_configurable() -> Result<()> {
    let store = store()?;
    store.add_policy_json(
        r#"{"apiVersion": "v1", "resourcePolicy": {"resource": "deep:*", "rules": [
            {"actions": ["read"], "effect": "ALLOW", "condition": {"script": "((((((((true))))))))"}}
        ]}}"#,
    )?;
    let params = RequestParams::new("alice", "deep:1", ["read"]);

    let engine = Engine::with_memory_store(store.clone());
    assert_eq!(engine.evaluate(&params).await?, Decision::Allow);

    let config = EngineConfig::from_json_str(r#"{"maxExpressionDepth": 4}"#)?;
    let shallow = Engine::with_memory_store(store).with_config(config)?;
    let evaluation = shallow.evaluate_with_trace(&params).await?;
    assert_eq!(evaluation.decision, Decision::Deny);
    assert_eq!(evaluation.errors().count(), 1);
    Ok(())
}

#[tokio::test]
async fn nul_in_condition_does_not_grant() -> Result<()> {
    let store = store()?;
    store.add_policy_json(
        r#"{"apiVersion": "v1", "resourcePolicy": {"resource": "vault:*", "rules": [
            {"actions": ["delete"], "effect": "ALLOW",
             "condition": {"script": "true\u0000 && P.isAdmin === true"}}
        ]}}"#,
    )?;
    store.add_principal("mallory", attrs(r#"{"isAdmin": false}"#)?);
    let engine = Engine::with_memory_store(store);

    let params = RequestParams::new("mallory", "vault:1", ["delete"]);
    let evaluation = engine.evaluate_with_trace(&params).await?;
    assert_eq!(evaluation.decision, Decision::Deny);
    assert_eq!(evaluation.errors().count(), 1);
    Ok(())
}

#[tokio::test]
async fn long_flat_conditions_are_not_nesting() -> Result<()> {
    let store = store()?;
    let chain = (0..70)
        .map(|i| format!("P.dept === 'd{i}'"))
        .collect::<Vec<_>>()
        .join(" || ");
    let policy = serde_json::json!({
        "apiVersion": "v1",
        "resourcePolicy": {"resource": "wide:*", "rules": [
            {"actions": ["read"], "effect": "ALLOW", "condition": {"script": chain}}
        ]}
    });
    store.add_policy_json(&policy.to_string())?;
    store.add_principal("carol", attrs(r#"{"dept": "d69"}"#)?);
    let engine = Engine::with_memory_store(store);

    let params = RequestParams::new("carol", "wide:1", ["read"]);
    let evaluation = engine.evaluate_with_trace(&params).await?;
    assert_eq!(evaluation.decision, Decision::Allow);
    assert_eq!(evaluation.errors().count(), 0);
    Ok(())
}

// A policy store that is down.
struct FailingStore;

#[async_trait]
impl PolicyStore for FailingStore {
    async fn find_applicable_policies(&self, _: &str, _: &str) -> anyhow::Result<Vec<Arc<Policy>>> {
        Err(anyhow!("connection refused"))
    }

    async fn list_exported_variable_sets(&self) -> anyhow::Result<Vec<BTreeMap<String, String>>> {
        Ok(vec![])
    }
}

// An attribute store that never answers in time.
struct SlowStore;

#[async_trait]
impl AttributeStore for SlowStore {
    async fn get_principal(&self, _: &str) -> anyhow::Result<Option<AttributeMap>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn get_resource(&self, _: &str) -> anyhow::Result<Option<AttributeMap>> {
        Ok(None)
    }

    async fn get_active_facts(&self, _: &str, _: FactKind) -> anyhow::Result<Vec<Fact>> {
        Ok(vec![])
    }

    async fn get_blacklist_entries(&self, _: &[String]) -> anyhow::Result<Vec<BlacklistEntry>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn policy_store_failure_is_not_a_denial() -> Result<()> {
    let engine = Engine::new(Arc::new(FailingStore), store()?);
    let params = RequestParams::new("alice", "doc:1", ["read"]);
    match engine.evaluate(&params).await {
        Err(Error::StoreUnavailable(message)) => {
            assert!(message.contains("find_applicable_policies"), "{message}");
            assert!(message.contains("connection refused"), "{message}");
        }
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn attribute_store_timeout_is_not_a_denial() -> Result<()> {
    let config = EngineConfig {
        store_timeout_ms: 50,
        ..Default::default()
    };
    let engine = Engine::new(store()?, Arc::new(SlowStore)).with_config(config)?;
    let params = RequestParams::new("alice", "doc:1", ["read"]);
    match engine.evaluate(&params).await {
        Err(Error::StoreUnavailable(message)) => {
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
    Ok(())
}
