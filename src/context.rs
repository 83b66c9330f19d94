// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-request evaluation context.
//!
//! A context is assembled once per call from the stores and then only ever
//! extended by pure `with_*` steps that return a new context.

use crate::clock::Clock;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::store::{guarded, AttributeMap, AttributeStore, FactKind, PolicyStore};
use crate::trace::TraceEntry;
use crate::value::Value;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Input to one evaluation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub principal_id: String,
    pub resource_id: String,
    pub actions: Vec<String>,
    #[serde(default)]
    pub environment: AttributeMap,
    #[serde(default)]
    pub variables: AttributeMap,
}

impl RequestParams {
    pub fn new<A, S>(principal_id: impl Into<String>, resource_id: impl Into<String>, actions: A) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principal_id: principal_id.into(),
            resource_id: resource_id.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            environment: AttributeMap::new(),
            variables: AttributeMap::new(),
        }
    }

    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Blacklist status of the request's principal and resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlacklistStatus {
    pub principal: bool,
    pub resource: bool,
    /// Every live blacklisted id among the request's ids.
    pub ids: Vec<String>,
}

impl BlacklistStatus {
    fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("principal".to_string(), Value::Bool(self.principal));
        map.insert("resource".to_string(), Value::Bool(self.resource));
        map.insert(
            "ids".to_string(),
            Value::from_array(self.ids.iter().map(|id| Value::from(id.as_str())).collect()),
        );
        Value::from(map)
    }
}

/// The read-only data conditions are evaluated against.
///
/// Variables are kept in three layers. The view seen by conditions merges
/// them with later layers winning: exported, then policy-local, then request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    principal: Value,
    resource: Value,
    environment: Value,
    exported: Value,
    local: Value,
    request: Value,
    derived_roles: BTreeSet<String>,
    blacklist: BlacklistStatus,
}

impl EvaluationContext {
    pub fn new(principal: Value, resource: Value, environment: Value) -> Self {
        Self {
            principal,
            resource,
            environment,
            ..Default::default()
        }
    }

    pub fn principal(&self) -> &Value {
        &self.principal
    }

    pub fn resource(&self) -> &Value {
        &self.resource
    }

    pub fn derived_roles(&self) -> &BTreeSet<String> {
        &self.derived_roles
    }

    pub fn blacklist(&self) -> &BlacklistStatus {
        &self.blacklist
    }

    pub fn with_exported_variables(&self, exported: Value) -> Self {
        Self {
            exported,
            ..self.clone()
        }
    }

    pub fn with_local_variables(&self, local: Value) -> Self {
        Self {
            local,
            ..self.clone()
        }
    }

    pub fn with_request_variables(&self, request: Value) -> Self {
        Self {
            request,
            ..self.clone()
        }
    }

    pub fn with_derived_roles(&self, derived_roles: BTreeSet<String>) -> Self {
        Self {
            derived_roles,
            ..self.clone()
        }
    }

    pub fn with_blacklist(&self, blacklist: BlacklistStatus) -> Self {
        Self {
            blacklist,
            ..self.clone()
        }
    }

    /// Roles held statically through `P.role` or `P.roles`.
    pub fn static_roles(&self) -> BTreeSet<String> {
        let mut roles = BTreeSet::new();
        if let Value::String(r) = &self.principal["role"] {
            roles.insert(r.to_string());
        }
        if let Value::Array(rs) = &self.principal["roles"] {
            roles.extend(rs.iter().filter_map(|r| r.as_string().ok()).map(|r| r.to_string()));
        }
        roles
    }

    /// Groups listed in `P.groups`.
    pub fn groups(&self) -> BTreeSet<String> {
        match &self.principal["groups"] {
            Value::Array(gs) => gs
                .iter()
                .filter_map(|g| g.as_string().ok())
                .map(|g| g.to_string())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Merged variables, later layers winning. A layer that is not an
    /// object is skipped.
    pub fn variables(&self) -> Value {
        [&self.exported, &self.local, &self.request]
            .into_iter()
            .fold(Value::new_object(), |merged, layer| {
                merged.merged(layer).unwrap_or(merged)
            })
    }

    /// Context without variables or derived roles. Variable definitions are
    /// evaluated against this.
    pub fn base_value(&self) -> Value {
        let mut map = BTreeMap::new();
        for (short, long, value) in [
            ("P", "principal", &self.principal),
            ("R", "resource", &self.resource),
            ("E", "environment", &self.environment),
        ] {
            map.insert(short.to_string(), value.clone());
            map.insert(long.to_string(), value.clone());
        }
        map.insert("blacklist".to_string(), self.blacklist.to_value());
        Value::from(map)
    }

    /// The full view handed to the interpreter.
    pub fn to_value(&self) -> Value {
        let mut value = self.base_value();
        let variables = self.variables();
        let roles = Value::from_array(
            self.derived_roles
                .iter()
                .map(|r| Value::from(r.as_str()))
                .collect(),
        );
        if let Value::Object(m) = &mut value {
            let m = std::sync::Arc::make_mut(m);
            m.insert("V".into(), variables.clone());
            m.insert("variables".into(), variables);
            m.insert("derivedRoles".into(), roles);
        }
        value
    }
}

/// Evaluate named variable definitions against `base`. A definition that
/// fails to parse or evaluate is bound to `undefined` and reported.
pub fn evaluate_variables(
    definitions: &BTreeMap<String, String>,
    base: &Value,
    clock: &dyn Clock,
    max_depth: usize,
    trace: &mut Vec<TraceEntry>,
) -> Value {
    let mut interp = Interpreter::new(base, clock).with_max_depth(max_depth);
    let mut values = BTreeMap::new();
    for (name, expr) in definitions {
        let source = format!("variable:{name}");
        let value = match interp.eval_str(&source, expr) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(variable = %name, error = %e, "variable definition failed");
                trace.push(TraceEntry::error(&source, e.to_string()));
                Value::Undefined
            }
        };
        for d in interp.take_diagnostics() {
            trace.push(TraceEntry::diagnostic(&source, d.message()));
        }
        values.insert(name.clone(), value);
    }
    Value::from(values)
}

/// Assembles an [`EvaluationContext`] from the stores.
pub struct ContextBuilder<'a> {
    policies: &'a dyn PolicyStore,
    attributes: &'a dyn AttributeStore,
    clock: &'a dyn Clock,
    timeout: Duration,
    max_depth: usize,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(
        policies: &'a dyn PolicyStore,
        attributes: &'a dyn AttributeStore,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            policies,
            attributes,
            clock,
            timeout: crate::config::EngineConfig::default().store_timeout(),
            max_depth: crate::parser::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetch records, facts, blacklist entries and exported variables.
    ///
    /// Missing principal or resource records become empty objects. Only
    /// store failures and timeouts are errors.
    pub async fn build(
        &self,
        params: &RequestParams,
        trace: &mut Vec<TraceEntry>,
    ) -> Result<EvaluationContext> {
        let principal = self
            .record(&params.principal_id, FactKind::Principal)
            .await?;
        let resource = self.record(&params.resource_id, FactKind::Resource).await?;
        let blacklist = self.blacklist(params).await?;
        let context = EvaluationContext::new(
            principal,
            resource,
            Value::from(params.environment.clone()),
        )
        .with_blacklist(blacklist);

        let sets = guarded(
            "list_exported_variable_sets",
            self.timeout,
            self.policies.list_exported_variable_sets(),
        )
        .await?;
        let mut definitions = BTreeMap::new();
        for set in sets {
            definitions.extend(set);
        }
        let exported = evaluate_variables(
            &definitions,
            &context.base_value(),
            self.clock,
            self.max_depth,
            trace,
        );

        Ok(context
            .with_exported_variables(exported)
            .with_request_variables(Value::from(params.variables.clone())))
    }

    // The stored record with live facts layered over it, plus `id`.
    async fn record(&self, id: &str, kind: FactKind) -> Result<Value> {
        let base = match kind {
            FactKind::Principal => {
                guarded("get_principal", self.timeout, self.attributes.get_principal(id)).await?
            }
            FactKind::Resource => {
                guarded("get_resource", self.timeout, self.attributes.get_resource(id)).await?
            }
        };
        let facts = guarded(
            "get_active_facts",
            self.timeout,
            self.attributes.get_active_facts(id, kind),
        )
        .await?;

        let now = self.clock.now();
        let layered = facts
            .into_iter()
            .filter(|f| f.is_live(now))
            .fold(base.unwrap_or_default(), |mut attrs, fact| {
                attrs.extend(fact.attributes);
                attrs
            });
        let mut attrs = layered;
        attrs.insert("id".to_string(), Value::from(id));
        Ok(Value::from(attrs))
    }

    async fn blacklist(&self, params: &RequestParams) -> Result<BlacklistStatus> {
        let ids = vec![params.principal_id.clone(), params.resource_id.clone()];
        let entries = guarded(
            "get_blacklist_entries",
            self.timeout,
            self.attributes.get_blacklist_entries(&ids),
        )
        .await?;
        let now = self.clock.now();
        let live: BTreeSet<String> = entries
            .into_iter()
            .filter(|e| e.is_live(now))
            .map(|e| e.id)
            .collect();
        Ok(BlacklistStatus {
            principal: live.contains(&params.principal_id),
            resource: live.contains(&params.resource_id),
            ids: live.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::policy::Policy;
    use crate::store::{BlacklistEntry, Fact, MemoryStore};

    use chrono::Duration as Span;

    fn clock() -> anyhow::Result<FixedClock> {
        FixedClock::from_millis(1_700_000_000_000).ok_or_else(|| anyhow::anyhow!("clock"))
    }

    fn attrs(json: &str) -> anyhow::Result<AttributeMap> {
        Ok(serde_json::from_str(json)?)
    }

    #[tokio::test]
    async fn facts_override_and_expire() -> anyhow::Result<()> {
        let clock = clock()?;
        let store = MemoryStore::new();
        store.add_principal("alice", attrs(r#"{"level": 1, "team": "core"}"#)?);
        store.add_fact(Fact::new("alice", FactKind::Principal, attrs(r#"{"level": 2}"#)?));
        store.add_fact(
            Fact::new("alice", FactKind::Principal, attrs(r#"{"team": "ops"}"#)?)
                .with_expiry(clock.0 - Span::minutes(1)),
        );
        store.add_fact(
            Fact::new("doc:1", FactKind::Resource, attrs(r#"{"locked": true}"#)?)
                .with_expiry(clock.0 + Span::minutes(1)),
        );

        let mut trace = vec![];
        let params = RequestParams::new("alice", "doc:1", ["read"]);
        let ctx = ContextBuilder::new(&store, &store, &clock)
            .build(&params, &mut trace)
            .await?;
        let value = ctx.to_value();
        assert_eq!(value["P"]["level"], Value::from(2i64));
        assert_eq!(value["P"]["team"], Value::from("core"));
        assert_eq!(value["P"]["id"], Value::from("alice"));
        assert_eq!(value["R"]["locked"], Value::Bool(true));
        assert_eq!(value["resource"], value["R"]);
        assert!(trace.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_records_are_empty_objects() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let clock = clock()?;
        let params = RequestParams::new("nobody", "doc:999", ["write"]).with_environment("ip", "10.0.0.1");
        let ctx = ContextBuilder::new(&store, &store, &clock)
            .build(&params, &mut vec![])
            .await?;
        let value = ctx.to_value();
        assert_eq!(value["P"]["id"], Value::from("nobody"));
        assert_eq!(value["P"]["name"], Value::Undefined);
        assert_eq!(value["E"]["ip"], Value::from("10.0.0.1"));
        assert_eq!(value["derivedRoles"], Value::new_array());
        Ok(())
    }

    #[tokio::test]
    async fn variables_merge_last_wins() -> anyhow::Result<()> {
        let clock = clock()?;
        let store = MemoryStore::new();
        store.add_principal("alice", attrs(r#"{"level": 3}"#)?);
        store.add_policy(Policy::from_json_str(
            r#"{"apiVersion": "v1", "exportVariables": {"name": "common",
                "definitions": {"limit": "P.level * 10", "mode": "'strict'", "broken": "P.level +"}}}"#,
        )?)?;

        let mut trace = vec![];
        let params = RequestParams::new("alice", "doc:1", ["read"]).with_variable("mode", "relaxed");
        let ctx = ContextBuilder::new(&store, &store, &clock)
            .build(&params, &mut trace)
            .await?;

        let v = ctx.variables();
        assert_eq!(v["limit"], Value::from(30i64));
        assert_eq!(v["mode"], Value::from("relaxed"));
        assert_eq!(v["broken"], Value::Undefined);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].source, "variable:broken");

        let mut local = BTreeMap::new();
        local.insert("limit".to_string(), "1".to_string());
        let local = evaluate_variables(&local, &ctx.base_value(), &clock, 64, &mut trace);
        let scoped = ctx.with_local_variables(local);
        assert_eq!(scoped.variables()["limit"], Value::from(1i64));
        assert_eq!(ctx.variables()["limit"], Value::from(30i64));
        assert_eq!(scoped.to_value()["V"], scoped.to_value()["variables"]);
        Ok(())
    }

    #[tokio::test]
    async fn blacklist_flags() -> anyhow::Result<()> {
        let clock = clock()?;
        let store = MemoryStore::new();
        store.add_blacklist_entry(BlacklistEntry::new("doc:1"));
        store.add_blacklist_entry(BlacklistEntry {
            expires_at: Some(clock.0 - Span::seconds(1)),
            ..BlacklistEntry::new("alice")
        });
        let params = RequestParams::new("alice", "doc:1", ["read"]);
        let ctx = ContextBuilder::new(&store, &store, &clock)
            .build(&params, &mut vec![])
            .await?;
        assert!(!ctx.blacklist().principal);
        assert!(ctx.blacklist().resource);

        let value = ctx.to_value();
        let mut interp = Interpreter::new(&value, &clock);
        assert!(interp.eval_bool_str("<test>", "isBlacklisted()")?);
        assert!(interp.eval_bool_str("<test>", "isBlacklisted('doc:1')")?);
        assert!(!interp.eval_bool_str("<test>", "isBlacklisted('alice')")?);
        Ok(())
    }

    #[test]
    fn roles_and_groups() -> anyhow::Result<()> {
        let principal = Value::from_json_str(
            r#"{"role": "editor", "roles": ["viewer", 3], "groups": ["eng"]}"#,
        )?;
        let ctx = EvaluationContext::new(principal, Value::new_object(), Value::new_object());
        assert_eq!(
            ctx.static_roles().into_iter().collect::<Vec<_>>(),
            ["editor", "viewer"]
        );
        assert!(ctx.groups().contains("eng"));
        let roles = ["owner".to_string()].into_iter().collect();
        let with_roles = ctx.with_derived_roles(roles);
        assert!(ctx.derived_roles().is_empty());
        assert_eq!(
            with_roles.to_value()["derivedRoles"],
            Value::from(vec![Value::from("owner")])
        );
        Ok(())
    }
}
