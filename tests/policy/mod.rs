// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use arbiter::*;

const YAML: &str = r#"
apiVersion: api.arbiter/v1
name: documents
description: Document access
createdBy: ops
createdAt: "2024-03-01T10:00:00Z"
resourcePolicy:
  resource: "doc:*"
  rules:
    - name: owner-read
      actions: [read, list]
      effect: EFFECT_ALLOW
      condition:
        match:
          any:
            of:
              - expr: R.owner === P.id
              - none:
                  of:
                    - expr: R.private
"#;

#[test]
fn yaml_and_json_agree() -> Result<()> {
    let from_yaml = Policy::from_yaml_str(YAML)?;
    let json = serde_json::to_string(&from_yaml)?;
    let from_json = Policy::from_json_str(&json)?;
    assert_eq!(from_yaml, from_json);
    assert_eq!(from_yaml.kind(), PolicyKind::Resource);
    assert_eq!(from_yaml.id(), "documents");

    let rules = from_json
        .resource_policy
        .as_ref()
        .map(|p| p.rules.clone())
        .unwrap_or_default();
    assert_eq!(rules[0].effect, Effect::Allow);
    assert_eq!(rules[0].actions, ["read", "list"]);
    assert!(json.contains(r#""effect":"ALLOW""#));
    assert!(json.contains(r#""apiVersion""#));
    Ok(())
}

#[test]
fn at_most_one_body() {
    let json = r#"{
        "apiVersion": "v1",
        "resourcePolicy": {"resource": "a", "rules": []},
        "derivedRoles": {"name": "r", "definitions": []}
    }"#;
    assert!(matches!(Policy::from_json_str(json), Err(Error::InvalidPolicy(_))));
}

#[test]
fn unknown_effect_is_rejected() {
    let json = r#"{
        "apiVersion": "v1",
        "resourcePolicy": {"resource": "a", "rules": [{"actions": ["x"], "effect": "MAYBE"}]}
    }"#;
    assert!(matches!(Policy::from_json_str(json), Err(Error::InvalidPolicy(_))));
}

#[test]
fn memory_store_validates() {
    let store = MemoryStore::new();
    let mut policy = Policy::from_yaml_str(YAML).unwrap_or_else(|e| panic!("{e}"));
    policy.derived_roles = Some(DerivedRoleSet {
        name: "extra".to_string(),
        definitions: vec![],
    });
    assert!(store.add_policy(policy).is_err());
    assert!(store.policies().is_empty());
}
