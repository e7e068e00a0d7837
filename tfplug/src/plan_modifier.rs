//! Plan modifiers and the schema walk that applies them
//!
//! [`plan_resource_change`] runs every attribute's modifiers, including the
//! attributes of nested blocks, and collects the paths whose change forces
//! the resource to be destroyed and recreated.

use crate::schema::{Block, PlanModifier, PlanModifierRequest, PlanModifierResponse, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // Creation (null state) and values not yet known never force replacement
        let requires_replace = !request.state_value.is_null()
            && !request.state_value.is_unknown()
            && !request.plan_value.is_unknown()
            && !values_equal(&request.state_value, &request.plan_value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Keeps the prior state value for a computed attribute whose planned
/// value is unknown
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.plan_value, &request.state_value) {
            (Dynamic::Unknown, state) if !state.is_null() => state.clone(),
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Result of running the schema's plan modifiers
pub struct PlanOutcome {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Applies every plan modifier declared in `schema`
///
/// `prior_state` is null on create; nothing is replaced then.
pub fn plan_resource_change(
    schema: &Schema,
    config: &DynamicValue,
    prior_state: &DynamicValue,
    proposed_new_state: DynamicValue,
) -> PlanOutcome {
    let mut outcome = PlanOutcome {
        planned_state: proposed_new_state,
        requires_replace: vec![],
        diagnostics: vec![],
    };

    plan_block(
        &schema.block,
        AttributePath::root(),
        config,
        prior_state,
        &mut outcome,
    );

    outcome
}

/// Paths whose planned value differs from state and carries RequiresReplace
pub fn attributes_requiring_replace(
    schema: &Schema,
    prior_state: &DynamicValue,
    planned_state: &DynamicValue,
) -> Vec<AttributePath> {
    plan_resource_change(schema, planned_state, prior_state, planned_state.clone())
        .requires_replace
}

fn plan_block(
    block: &Block,
    base: AttributePath,
    config: &DynamicValue,
    prior_state: &DynamicValue,
    outcome: &mut PlanOutcome,
) {
    for attr in &block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let path = base.clone().attribute(&attr.name);
        let mut plan_value = outcome
            .planned_state
            .get(&path)
            .cloned()
            .unwrap_or(Dynamic::Null);
        let config_value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
        let state_value = prior_state.get(&path).cloned().unwrap_or(Dynamic::Null);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config_value.clone(),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            outcome.diagnostics.extend(response.diagnostics);
            if response.requires_replace && !outcome.requires_replace.contains(&path) {
                outcome.requires_replace.push(path.clone());
            }
        }

        if let Err(e) = outcome.planned_state.set(&path, plan_value) {
            outcome.diagnostics.push(
                Diagnostic::error("Failed to apply plan modifier", e.to_string())
                    .with_attribute(path),
            );
        }
    }

    for nested in &block.block_types {
        let path = base.clone().attribute(&nested.type_name);
        let planned_len = list_len(outcome.planned_state.get(&path));
        let prior_len = list_len(prior_state.get(&path));

        if planned_len != prior_len && !prior_state.is_null() && block_forces_replace(&nested.block)
        {
            outcome.requires_replace.push(path.clone());
        }

        for i in 0..planned_len {
            plan_block(
                &nested.block,
                path.clone().index(i as i64),
                config,
                prior_state,
                outcome,
            );
        }
    }
}

fn list_len(value: Option<&Dynamic>) -> usize {
    value.and_then(Dynamic::as_list).map_or(0, <[Dynamic]>::len)
}

/// A block holding any replacing attribute is replaced when it is added or removed
fn block_forces_replace(block: &Block) -> bool {
    block.attributes.iter().any(|a| {
        a.plan_modifiers.iter().any(|m| {
            m.modify(PlanModifierRequest {
                config_value: Dynamic::Null,
                state_value: Dynamic::Bool(true),
                plan_value: Dynamic::Bool(false),
                path: AttributePath::root(),
            })
            .requires_replace
        })
    })
}

/// Compares two values, treating numbers within f64::EPSILON as equal
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}
