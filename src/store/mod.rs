// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Boundaries to the stores that own policies and identities.
//!
//! The engine only reads through these traits. Every call is wrapped in the
//! configured timeout and any failure surfaces as
//! [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).

mod memory;

pub use memory::MemoryStore;

use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::value::Value;

use core::future::Future;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AttributeMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FactKind {
    Principal,
    Resource,
}

/// Attributes asserted about a principal or resource, possibly temporary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub owner_id: String,
    pub kind: FactKind,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Fact {
    pub fn new(owner_id: impl Into<String>, kind: FactKind, attributes: AttributeMap) -> Self {
        Self {
            owner_id: owner_id.into(),
            kind,
            attributes,
            active: true,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |at| at > now)
    }
}

/// A principal or resource id barred from access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BlacklistEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: None,
            expires_at: None,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Policies relevant to a request: resource policies whose pattern
    /// matches `resource`, principal policies for exactly `principal_id`,
    /// role and group policies with a rule for `resource`, and every
    /// derived role set. Returned in store order.
    async fn find_applicable_policies(
        &self,
        resource: &str,
        principal_id: &str,
    ) -> anyhow::Result<Vec<Arc<Policy>>>;

    /// Definitions of every exported variable set, in store order.
    async fn list_exported_variable_sets(&self) -> anyhow::Result<Vec<BTreeMap<String, String>>>;
}

#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn get_principal(&self, id: &str) -> anyhow::Result<Option<AttributeMap>>;

    async fn get_resource(&self, id: &str) -> anyhow::Result<Option<AttributeMap>>;

    async fn get_active_facts(&self, owner_id: &str, kind: FactKind) -> anyhow::Result<Vec<Fact>>;

    async fn get_blacklist_entries(&self, ids: &[String]) -> anyhow::Result<Vec<BlacklistEntry>>;
}

/// Await a store call, bounded by `limit`. Timeouts and store failures both
/// become [`Error::StoreUnavailable`].
pub(crate) async fn guarded<T>(
    operation: &str,
    limit: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => {
            tracing::error!(operation, error = %e, "store call failed");
            Err(Error::store_unavailable(operation, e))
        }
        Err(_) => {
            tracing::error!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(Error::store_unavailable(
                operation,
                format!("timed out after {}ms", limit.as_millis()),
            ))
        }
    }
}
