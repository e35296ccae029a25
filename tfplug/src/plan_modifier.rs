//! Built-in plan modifiers
//!
//! Modifiers run per attribute from `Schema::plan_changes` and may rewrite
//! the planned value or flag the attribute as forcing replacement.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic};

/// Forces replacement when a known planned value differs from prior state
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
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;
        // Null prior state means create, not replace
        let requires_replace = !matches!(state, Dynamic::Null)
            && !matches!(plan, Dynamic::Unknown)
            && !values_equal(state, plan);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Keeps the prior state value for computed attributes that do not change
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
        let plan_value = match (&request.plan_value.value, &request.state_value.value) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan_value,
            (Dynamic::Unknown, _) => request.state_value,
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

/// Forces replacement when the predicate returns true for the change
pub struct RequiresReplaceIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync + 'static,
{
    pub fn create(predicate: F, description: impl Into<String>) -> Box<dyn PlanModifier> {
        Box::new(Self {
            predicate,
            description: description.into(),
        })
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;
        let requires_replace = !matches!(state, Dynamic::Null)
            && !matches!(plan, Dynamic::Unknown)
            && !values_equal(state, plan)
            && (self.predicate)(state, plan);

        let mut diagnostics = Vec::new();
        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Attribute '{}' requires resource replacement", request.path),
                    self.description.clone(),
                )
                .with_attribute(request.path),
            );
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

/// Structural equality with numeric tolerance and order-insensitive maps
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("protocol"),
        }
    }

    fn s(v: &str) -> Dynamic {
        Dynamic::String(v.to_string())
    }

    #[test]
    fn requires_replace_on_changed_value() {
        let response = RequiresReplace.modify(request(s("ospf"), s("openfabric")));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create_and_unknown() {
        assert!(!RequiresReplace.modify(request(Dynamic::Null, s("ospf"))).requires_replace);
        assert!(!RequiresReplace.modify(request(s("ospf"), Dynamic::Unknown)).requires_replace);
        assert!(!RequiresReplace.modify(request(s("ospf"), s("ospf"))).requires_replace);
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let response = UseStateForUnknown.modify(request(s("pending"), Dynamic::Unknown));
        assert_eq!(response.plan_value.value, s("pending"));

        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert_eq!(response.plan_value.value, Dynamic::Unknown);
    }

    #[test]
    fn requires_replace_if_consults_predicate() {
        let modifier = RequiresReplaceIf {
            predicate: |_: &Dynamic, plan: &Dynamic| matches!(plan, Dynamic::Null),
            description: "removing the value recreates the resource".to_string(),
        };

        let response = modifier.modify(request(s("a"), Dynamic::Null));
        assert!(response.requires_replace);
        assert_eq!(response.diagnostics.len(), 1);

        let response = modifier.modify(request(s("a"), s("b")));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_ignores_map_order() {
        let a = Dynamic::Map([("x".to_string(), s("1")), ("y".to_string(), s("2"))].into());
        let b = Dynamic::Map([("y".to_string(), s("2")), ("x".to_string(), s("1"))].into());
        assert!(values_equal(&a, &b));
    }
}
