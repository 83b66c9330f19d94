// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{AttributeMap, AttributeStore, BlacklistEntry, Fact, FactKind, PolicyStore};
use crate::ari;
use crate::error::Result;
use crate::policy::{Policy, PrincipalRule};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    policies: Vec<Arc<Policy>>,
    principals: BTreeMap<String, AttributeMap>,
    resources: BTreeMap<String, AttributeMap>,
    facts: Vec<Fact>,
    blacklist: Vec<BlacklistEntry>,
}

/// A process-local store for policies, identities, facts and blacklist
/// entries.
///
/// Readers receive `Arc` snapshots, so a policy replaced while an evaluation
/// is in flight is only seen by later evaluations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy after validating it. A policy with the same id replaces
    /// the previous one in place, keeping its position in store order.
    pub fn add_policy(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        let policy = Arc::new(policy);
        let id = policy.id();
        let mut inner = self.inner.write();
        match inner.policies.iter_mut().find(|p| p.id() == id) {
            Some(slot) => *slot = policy,
            None => inner.policies.push(policy),
        }
        Ok(())
    }

    #[cfg(feature = "yaml")]
    pub fn add_policy_yaml(&self, yaml: &str) -> Result<()> {
        self.add_policy(Policy::from_yaml_str(yaml)?)
    }

    pub fn add_policy_json(&self, json: &str) -> Result<()> {
        self.add_policy(Policy::from_json_str(json)?)
    }

    /// Remove the policy with the given id. Returns whether one was removed.
    pub fn remove_policy(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.policies.len();
        inner.policies.retain(|p| p.id() != id);
        inner.policies.len() != before
    }

    pub fn policies(&self) -> Vec<Arc<Policy>> {
        self.inner.read().policies.clone()
    }

    pub fn add_principal(&self, id: impl Into<String>, attributes: AttributeMap) {
        self.inner.write().principals.insert(id.into(), attributes);
    }

    pub fn add_resource(&self, id: impl Into<String>, attributes: AttributeMap) {
        self.inner.write().resources.insert(id.into(), attributes);
    }

    pub fn add_fact(&self, fact: Fact) {
        self.inner.write().facts.push(fact);
    }

    pub fn add_blacklist_entry(&self, entry: BlacklistEntry) {
        self.inner.write().blacklist.push(entry);
    }
}

fn any_rule_for(rules: &[PrincipalRule], resource: &str) -> bool {
    rules.iter().any(|r| ari::matches(&r.resource, resource))
}

fn is_applicable(policy: &Policy, resource: &str, principal_id: &str) -> bool {
    if policy.disabled {
        return false;
    }
    if let Some(p) = &policy.resource_policy {
        return ari::matches(&p.resource, resource);
    }
    if let Some(p) = &policy.principal_policy {
        return p.principal == principal_id;
    }
    if let Some(p) = &policy.role_policy {
        return any_rule_for(&p.rules, resource);
    }
    if let Some(p) = &policy.group_policy {
        return any_rule_for(&p.rules, resource);
    }
    policy.derived_roles.is_some()
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn find_applicable_policies(
        &self,
        resource: &str,
        principal_id: &str,
    ) -> anyhow::Result<Vec<Arc<Policy>>> {
        Ok(self
            .inner
            .read()
            .policies
            .iter()
            .filter(|p| is_applicable(p, resource, principal_id))
            .cloned()
            .collect())
    }

    async fn list_exported_variable_sets(&self) -> anyhow::Result<Vec<BTreeMap<String, String>>> {
        Ok(self
            .inner
            .read()
            .policies
            .iter()
            .filter(|p| !p.disabled)
            .filter_map(|p| p.export_variables.as_ref())
            .map(|set| set.definitions.clone())
            .collect())
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn get_principal(&self, id: &str) -> anyhow::Result<Option<AttributeMap>> {
        Ok(self.inner.read().principals.get(id).cloned())
    }

    async fn get_resource(&self, id: &str) -> anyhow::Result<Option<AttributeMap>> {
        Ok(self.inner.read().resources.get(id).cloned())
    }

    async fn get_active_facts(&self, owner_id: &str, kind: FactKind) -> anyhow::Result<Vec<Fact>> {
        Ok(self
            .inner
            .read()
            .facts
            .iter()
            .filter(|f| f.active && f.kind == kind && f.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_blacklist_entries(&self, ids: &[String]) -> anyhow::Result<Vec<BlacklistEntry>> {
        Ok(self
            .inner
            .read()
            .blacklist
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }
}
