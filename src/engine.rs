// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ari;
use crate::clock::{Clock, SystemClock};
use crate::condition::{evaluate_condition, Condition};
use crate::config::EngineConfig;
use crate::context::{evaluate_variables, ContextBuilder, EvaluationContext, RequestParams};
use crate::derived_roles::resolve_derived_roles;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::policy::{Decision, Effect, Policy, PrincipalRule, ResourceRule};
use crate::store::{guarded, AttributeStore, MemoryStore, PolicyStore};
use crate::trace::{Evaluation, TraceEntry, TraceEvent};
use crate::value::Value;

use std::collections::BTreeSet;
use std::sync::Arc;

/// What a single applicable rule contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The condition held; the rule asserts its effect.
    Matched(Effect),
    NotMatched,
    /// The condition could not be evaluated. Treated as not matching.
    Failed,
}

/// One step of conflict resolution: a matching rule overwrites whatever was
/// decided before it, anything else leaves the decision alone.
pub fn resolve(current: Option<Effect>, outcome: &RuleOutcome) -> Option<Effect> {
    match outcome {
        RuleOutcome::Matched(effect) => Some(*effect),
        RuleOutcome::NotMatched | RuleOutcome::Failed => current,
    }
}

/// Fold outcomes in evaluation order. With no match the answer is DENY.
pub fn decide<'a>(outcomes: impl IntoIterator<Item = &'a RuleOutcome>) -> Decision {
    outcomes
        .into_iter()
        .fold(None, resolve)
        .map(Decision::from)
        .unwrap_or(Decision::Deny)
}

/// The authorization engine.
///
/// An engine holds no per-request state. It can be cloned cheaply and shared
/// between tasks; every call builds its own context from the stores.
#[derive(Clone)]
pub struct Engine {
    policies: Arc<dyn PolicyStore>,
    attributes: Arc<dyn AttributeStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

// A rule that applies to the request and still has to have its condition
// checked.
struct Candidate<'p> {
    policy: usize,
    label: String,
    effect: Effect,
    condition: Option<&'p Condition>,
}

// Everything that does not depend on the requested actions.
struct Prepared {
    context: EvaluationContext,
    policies: Vec<Arc<Policy>>,
    locals: Vec<Option<Value>>,
    matched: Vec<String>,
    trace: Vec<TraceEntry>,
}

fn policy_label(policy: &Policy) -> String {
    match &policy.name {
        Some(name) => format!("{}:{name}", policy.kind().as_str()),
        None => policy.id(),
    }
}

fn covers(patterns: &[String], actions: &[String]) -> bool {
    actions.iter().any(|a| ari::matches_any(patterns, a))
}

// A rule without role restrictions applies to everyone. Otherwise one of the
// listed static or derived roles has to be held.
fn roles_permit(
    rule: &ResourceRule,
    static_roles: &BTreeSet<String>,
    derived_roles: &BTreeSet<String>,
) -> bool {
    if rule.roles.is_empty() && rule.derived_roles.is_empty() {
        return true;
    }
    rule.roles
        .iter()
        .any(|r| r == ari::WILDCARD || static_roles.contains(r))
        || rule.derived_roles.iter().any(|r| derived_roles.contains(r))
}

fn resource_candidates<'p>(
    policy: usize,
    label: &str,
    rules: &'p [ResourceRule],
    context: &EvaluationContext,
    actions: &[String],
    out: &mut Vec<Candidate<'p>>,
) {
    let static_roles = context.static_roles();
    for (idx, rule) in rules.iter().enumerate() {
        if !covers(&rule.actions, actions)
            || !roles_permit(rule, &static_roles, context.derived_roles())
        {
            continue;
        }
        out.push(Candidate {
            policy,
            label: format!("{label}#{}", rule.name.clone().unwrap_or_else(|| format!("rule-{idx}"))),
            effect: rule.effect,
            condition: rule.condition.as_ref(),
        });
    }
}

fn principal_candidates<'p>(
    policy: usize,
    label: &str,
    rules: &'p [PrincipalRule],
    resource_id: &str,
    actions: &[String],
    out: &mut Vec<Candidate<'p>>,
) {
    for (idx, rule) in rules.iter().enumerate() {
        if !ari::matches(&rule.resource, resource_id) {
            continue;
        }
        for (adx, action) in rule.actions.iter().enumerate() {
            if !actions.iter().any(|a| ari::matches(&action.action, a)) {
                continue;
            }
            let name = action
                .name
                .clone()
                .unwrap_or_else(|| format!("rule-{idx}-{adx}"));
            out.push(Candidate {
                policy,
                label: format!("{label}#{name}"),
                effect: action.effect,
                condition: action.condition.as_ref(),
            });
        }
    }
}

// Flatten the policies into the rules that apply, in policy then rule order.
fn candidates<'p>(
    policies: &'p [Arc<Policy>],
    context: &EvaluationContext,
    params: &RequestParams,
    actions: &[String],
) -> Vec<Candidate<'p>> {
    let static_roles = context.static_roles();
    let groups = context.groups();
    let mut out = vec![];
    for (idx, policy) in policies.iter().enumerate() {
        let label = policy_label(policy);
        if let Some(p) = &policy.resource_policy {
            if ari::matches(&p.resource, &params.resource_id) {
                resource_candidates(idx, &label, &p.rules, context, actions, &mut out);
            }
        } else if let Some(p) = &policy.principal_policy {
            if p.principal == params.principal_id {
                principal_candidates(idx, &label, &p.rules, &params.resource_id, actions, &mut out);
            }
        } else if let Some(p) = &policy.role_policy {
            if static_roles.contains(&p.role) || context.derived_roles().contains(&p.role) {
                principal_candidates(idx, &label, &p.rules, &params.resource_id, actions, &mut out);
            }
        } else if let Some(p) = &policy.group_policy {
            if groups.contains(&p.group) {
                principal_candidates(idx, &label, &p.rules, &params.resource_id, actions, &mut out);
            }
        }
    }
    out
}

impl Engine {
    pub fn new(policies: Arc<dyn PolicyStore>, attributes: Arc<dyn AttributeStore>) -> Self {
        Self {
            policies,
            attributes,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    /// An engine reading policies and attributes from one in-memory store.
    pub fn with_memory_store(store: impl Into<Arc<MemoryStore>>) -> Self {
        let store = store.into();
        Self::new(store.clone(), store)
    }

    /// Use `clock` for time builtins and fact expiry.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide the request as a whole: a rule applies when its actions cover
    /// any of the requested actions.
    pub async fn evaluate(&self, params: &RequestParams) -> Result<Decision> {
        Ok(self.evaluate_with_trace(params).await?.decision)
    }

    /// One decision per requested action, in request order. The context is
    /// built once and shared by all actions.
    pub async fn evaluate_actions(&self, params: &RequestParams) -> Result<Vec<(String, Decision)>> {
        let prepared = self.prepare(params).await?;
        Ok(params
            .actions
            .iter()
            .map(|action| {
                let evaluation = self.conclude(&prepared, params, std::slice::from_ref(action));
                (action.clone(), evaluation.decision)
            })
            .collect())
    }

    /// Which rules and derived roles matched, for audit and debugging.
    pub async fn evaluate_policies(&self, params: &RequestParams) -> Result<Vec<String>> {
        Ok(self.evaluate_with_trace(params).await?.matched)
    }

    pub async fn evaluate_with_trace(&self, params: &RequestParams) -> Result<Evaluation> {
        let prepared = self.prepare(params).await?;
        let evaluation = self.conclude(&prepared, params, &params.actions);
        tracing::debug!(
            principal = %params.principal_id,
            resource = %params.resource_id,
            actions = ?params.actions,
            decision = %evaluation.decision,
            "evaluated request"
        );
        Ok(evaluation)
    }

    async fn prepare(&self, params: &RequestParams) -> Result<Prepared> {
        let mut trace = vec![];
        let depth = self.config.max_expression_depth;
        let context = ContextBuilder::new(&*self.policies, &*self.attributes, &*self.clock)
            .with_timeout(self.config.store_timeout())
            .with_max_depth(depth)
            .build(params, &mut trace)
            .await?;

        let policies: Vec<Arc<Policy>> = guarded(
            "find_applicable_policies",
            self.config.store_timeout(),
            self.policies
                .find_applicable_policies(&params.resource_id, &params.principal_id),
        )
        .await?
        .into_iter()
        .filter(|p| !p.disabled)
        .collect();

        let base = context.base_value();
        let locals: Vec<Option<Value>> = policies
            .iter()
            .map(|p| {
                p.local_variables()
                    .filter(|defs| !defs.is_empty())
                    .map(|defs| evaluate_variables(defs, &base, &*self.clock, depth, &mut trace))
            })
            .collect();

        let mut roles = BTreeSet::new();
        for (policy, local) in policies.iter().zip(&locals) {
            if let Some(set) = &policy.derived_roles {
                let value = scoped(&context, local).to_value();
                let mut interp = Interpreter::new(&value, &*self.clock).with_max_depth(depth);
                roles.extend(resolve_derived_roles(&set.definitions, &mut interp, &mut trace));
            }
        }
        let matched = roles.iter().map(|r| format!("derivedRole:{r}")).collect();

        Ok(Prepared {
            context: context.with_derived_roles(roles),
            policies,
            locals,
            matched,
            trace,
        })
    }

    fn conclude(&self, prepared: &Prepared, params: &RequestParams, actions: &[String]) -> Evaluation {
        let mut matched = prepared.matched.clone();
        let mut trace = prepared.trace.clone();
        let mut values: Vec<Option<Value>> = vec![None; prepared.policies.len()];
        let mut outcomes = vec![];

        for candidate in candidates(&prepared.policies, &prepared.context, params, actions) {
            let value = values[candidate.policy].get_or_insert_with(|| {
                scoped(&prepared.context, &prepared.locals[candidate.policy]).to_value()
            });
            let mut interp = Interpreter::new(value, &*self.clock)
                .with_max_depth(self.config.max_expression_depth);

            let outcome = match evaluate_condition(candidate.condition, &mut interp) {
                Ok(true) => RuleOutcome::Matched(candidate.effect),
                Ok(false) => RuleOutcome::NotMatched,
                Err(e) => {
                    tracing::warn!(rule = %candidate.label, error = %e, "rule condition failed");
                    trace.push(TraceEntry::error(&candidate.label, e.to_string()));
                    RuleOutcome::Failed
                }
            };
            for d in interp.take_diagnostics() {
                trace.push(TraceEntry::diagnostic(&candidate.label, d.message()));
            }
            tracing::debug!(rule = %candidate.label, outcome = ?outcome, "rule evaluated");

            match outcome {
                RuleOutcome::Matched(effect) => {
                    matched.push(candidate.label.clone());
                    trace.push(
                        TraceEntry::new(&candidate.label, TraceEvent::Matched)
                            .with_message(effect.as_str()),
                    );
                }
                RuleOutcome::NotMatched if self.config.enable_tracing => {
                    trace.push(TraceEntry::new(&candidate.label, TraceEvent::NotMatched));
                }
                _ => (),
            }
            outcomes.push(outcome);
        }

        Evaluation {
            decision: decide(&outcomes),
            matched,
            trace,
        }
    }
}

fn scoped(context: &EvaluationContext, local: &Option<Value>) -> EvaluationContext {
    match local {
        Some(local) => context.with_local_variables(local.clone()),
        None => context.clone(),
    }
}
