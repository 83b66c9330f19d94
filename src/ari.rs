// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resource identifier patterns.
//!
//! Resource ids are hierarchical strings such as `doc:reports:42`. Policy
//! resources and rule actions may contain `*`, which matches any run of
//! characters, so `doc:*` covers every document and `*` covers everything.

use std::collections::HashMap;
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use lazy_static::lazy_static;
use parking_lot::RwLock;

pub const WILDCARD: &str = "*";

lazy_static! {
    static ref MATCHERS: RwLock<HashMap<String, Option<Arc<GlobMatcher>>>> =
        RwLock::new(HashMap::new());
}

pub fn is_pattern(pattern: &str) -> bool {
    pattern.contains('*')
}

// Only `*` is special in a pattern. Other glob syntax is matched literally
// and `*` crosses `:` and `/`.
fn compile(pattern: &str) -> Option<Arc<GlobMatcher>> {
    let mut glob = pattern
        .split('*')
        .map(globset::escape)
        .collect::<Vec<_>>()
        .join("*");
    while glob.contains("**") {
        glob = glob.replace("**", "*");
    }
    match GlobBuilder::new(&glob).literal_separator(false).build() {
        Ok(g) => Some(Arc::new(g.compile_matcher())),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid resource pattern");
            None
        }
    }
}

fn matcher(pattern: &str) -> Option<Arc<GlobMatcher>> {
    if let Some(m) = MATCHERS.read().get(pattern) {
        return m.clone();
    }
    let m = compile(pattern);
    MATCHERS.write().insert(pattern.to_string(), m.clone());
    m
}

/// Match `value` against `pattern`, where `*` matches any sequence.
pub fn matches(pattern: &str, value: &str) -> bool {
    if !is_pattern(pattern) {
        return pattern == value;
    }
    matcher(pattern).map_or(false, |m| m.is_match(value))
}

/// True if any pattern in `patterns` matches `value`.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], value: &str) -> bool {
    patterns.iter().any(|p| matches(p.as_ref(), value))
}
