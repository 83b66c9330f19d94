// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What a matching rule asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "ALLOW",
            Effect::Deny => "DENY",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Effect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("EFFECT_").unwrap_or(&upper) {
            "ALLOW" => Ok(Effect::Allow),
            "DENY" => Ok(Effect::Deny),
            _ => Err(Error::invalid_policy(format!("unknown effect `{s}`"))),
        }
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The outcome of one evaluation for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Deny,
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Allow => Decision::Allow,
            Effect::Deny => Decision::Deny,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        })
    }
}

fn default_version() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub actions: Vec<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePolicy {
    pub resource: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<ResourceRule>,
}

/// One action entry of a principal, role or group rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub action: String,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRule {
    pub resource: String,
    #[serde(default)]
    pub actions: Vec<ActionRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPolicy {
    pub principal: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<PrincipalRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicy {
    pub role: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<PrincipalRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicy {
    pub group: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<PrincipalRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDef {
    pub name: String,
    /// Lineage only. Qualifying for a role never implies its parents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRoleSet {
    pub name: String,
    #[serde(default)]
    pub definitions: Vec<RoleDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedVariableSet {
    pub name: String,
    #[serde(default)]
    pub definitions: BTreeMap<String, String>,
}

/// Variables defined for the rules of a single policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVariables {
    #[serde(default)]
    pub local: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Resource,
    Principal,
    Role,
    Group,
    DerivedRoles,
    ExportVariables,
    Empty,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Resource => "resource",
            PolicyKind::Principal => "principal",
            PolicyKind::Role => "role",
            PolicyKind::Group => "group",
            PolicyKind::DerivedRoles => "derivedRoles",
            PolicyKind::ExportVariables => "exportVariables",
            PolicyKind::Empty => "empty",
        }
    }
}

/// A policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<ResourcePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_policy: Option<PrincipalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_policy: Option<RolePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_policy: Option<GroupPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_roles: Option<DerivedRoleSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_variables: Option<ExportedVariableSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<PolicyVariables>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Policy {
    pub fn from_json_str(json: &str) -> Result<Policy> {
        let policy: Policy = serde_json::from_str(json).map_err(Error::invalid_policy)?;
        policy.validate()?;
        Ok(policy)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Policy> {
        let policy: Policy = serde_yaml::from_str(yaml).map_err(Error::invalid_policy)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_value(value: &Value) -> Result<Policy> {
        let json = serde_json::to_string(value).map_err(Error::invalid_policy)?;
        Self::from_json_str(&json)
    }

    /// A document carries at most one policy body.
    pub fn validate(&self) -> Result<()> {
        let bodies = [
            self.resource_policy.is_some(),
            self.principal_policy.is_some(),
            self.role_policy.is_some(),
            self.group_policy.is_some(),
            self.derived_roles.is_some(),
            self.export_variables.is_some(),
        ];
        let count = bodies.iter().filter(|b| **b).count();
        if count > 1 {
            return Err(Error::invalid_policy(format!(
                "policy `{}` declares {count} bodies; at most one is allowed",
                self.id()
            )));
        }
        if let Some(rp) = &self.resource_policy {
            if let Some(rule) = rp.rules.iter().find(|r| r.actions.is_empty()) {
                return Err(Error::invalid_policy(format!(
                    "rule `{}` of `{}` lists no actions",
                    rule.name.as_deref().unwrap_or("<unnamed>"),
                    self.id()
                )));
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> PolicyKind {
        if self.resource_policy.is_some() {
            PolicyKind::Resource
        } else if self.principal_policy.is_some() {
            PolicyKind::Principal
        } else if self.role_policy.is_some() {
            PolicyKind::Role
        } else if self.group_policy.is_some() {
            PolicyKind::Group
        } else if self.derived_roles.is_some() {
            PolicyKind::DerivedRoles
        } else if self.export_variables.is_some() {
            PolicyKind::ExportVariables
        } else {
            PolicyKind::Empty
        }
    }

    /// Name used in diagnostics: the explicit name, else the subject of the body.
    pub fn id(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let subject = match (
            &self.resource_policy,
            &self.principal_policy,
            &self.role_policy,
            &self.group_policy,
            &self.derived_roles,
            &self.export_variables,
        ) {
            (Some(p), ..) => p.resource.as_str(),
            (_, Some(p), ..) => p.principal.as_str(),
            (_, _, Some(p), ..) => p.role.as_str(),
            (_, _, _, Some(p), ..) => p.group.as_str(),
            (_, _, _, _, Some(p), _) => p.name.as_str(),
            (_, _, _, _, _, Some(p)) => p.name.as_str(),
            _ => "",
        };
        format!("{}:{subject}", self.kind().as_str())
    }

    pub fn local_variables(&self) -> Option<&BTreeMap<String, String>> {
        self.variables.as_ref().map(|v| &v.local)
    }
}
