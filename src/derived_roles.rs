// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::condition::evaluate_condition;
use crate::interpreter::Interpreter;
use crate::policy::RoleDef;
use crate::trace::{TraceEntry, TraceEvent};

use std::collections::BTreeSet;

/// Names of the roles in `definitions` whose condition holds.
///
/// Each definition is judged on its own condition only; `parentRoles` does
/// not propagate qualification either way. A definition whose condition
/// fails to evaluate does not qualify and the failure is recorded in `trace`.
pub fn resolve_derived_roles(
    definitions: &[RoleDef],
    interp: &mut Interpreter,
    trace: &mut Vec<TraceEntry>,
) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    for def in definitions {
        let source = format!("derivedRole:{}", def.name);
        let qualifies = match evaluate_condition(def.condition.as_ref(), interp) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(role = %def.name, error = %e, "derived role condition failed");
                trace.push(TraceEntry::error(&source, e.to_string()));
                false
            }
        };
        for d in interp.take_diagnostics() {
            trace.push(TraceEntry::diagnostic(&source, d.message()));
        }
        tracing::debug!(role = %def.name, qualifies, "derived role resolved");
        if qualifies {
            trace.push(TraceEntry::new(&source, TraceEvent::Matched));
            roles.insert(def.name.clone());
        }
    }
    roles
}
