//! Helpers shared by resources and data sources

pub(crate) use crate::provider_data::provider_data_from;
use regex::Regex;
use std::collections::HashMap;
use tfplug::schema::AttributeBuilder;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringPatternValidator;

/// Identifier accepted by SDN objects: a letter followed by up to seven letters or digits
pub(crate) const SDN_ID_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9]{0,7}$";

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn empty_state() -> DynamicValue {
    DynamicValue::new(Dynamic::Map(HashMap::new()))
}

/// Attaches a regex validator; the pattern is a compile time constant
pub(crate) fn with_pattern(
    builder: AttributeBuilder,
    pattern: &str,
    description: &str,
) -> AttributeBuilder {
    match Regex::new(pattern) {
        Ok(regex) => builder.validator(StringPatternValidator::new(regex, description)),
        Err(e) => {
            tracing::error!("Invalid validation pattern {}: {}", pattern, e);
            builder
        }
    }
}

/// API field names of optional attributes that were set before and are now null.
///
/// `fields` pairs an attribute name with the field name the API expects.
pub(crate) fn removed_fields(
    prior: &DynamicValue,
    planned: &DynamicValue,
    fields: &[(&str, &str)],
) -> Vec<String> {
    fields
        .iter()
        .filter(|(attribute, _)| {
            let path = AttributePath::new(attribute);
            planned.is_attribute_null(&path) && !prior.is_attribute_null(&path)
        })
        .map(|(_, api_name)| api_name.to_string())
        .collect()
}

/// Numbers arrive as f64; reject fractions and negatives rather than truncating
pub(crate) fn get_optional_u64(value: &DynamicValue, attribute: &str) -> Option<u64> {
    value
        .get_optional_number(&AttributePath::new(attribute))
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    #[test]
    fn removed_fields_lists_cleared_attributes_only() {
        let prior = state(&[
            ("ip_prefix", Dynamic::String("10.0.0.0/16".into())),
            ("ip6_prefix", Dynamic::String("fd00::/64".into())),
            ("hello_interval", Dynamic::Null),
        ]);
        let planned = state(&[
            ("ip_prefix", Dynamic::String("10.0.0.0/16".into())),
            ("ip6_prefix", Dynamic::Null),
            ("hello_interval", Dynamic::Null),
        ]);

        let removed = removed_fields(
            &prior,
            &planned,
            &[
                ("ip_prefix", "ip_prefix"),
                ("ip6_prefix", "ip6_prefix"),
                ("hello_interval", "hello_interval"),
            ],
        );
        assert_eq!(removed, vec!["ip6_prefix".to_string()]);
    }

    #[test]
    fn whole_numbers_only() {
        let value = state(&[
            ("mtu", Dynamic::Number(1500.0)),
            ("bad", Dynamic::Number(1.5)),
        ]);
        assert_eq!(get_optional_u64(&value, "mtu"), Some(1500));
        assert_eq!(get_optional_u64(&value, "bad"), None);
        assert_eq!(get_optional_u64(&value, "missing"), None);
    }

    #[test]
    fn sdn_ids() {
        let re = Regex::new(SDN_ID_PATTERN).unwrap();
        assert!(re.is_match("fabric1"));
        assert!(!re.is_match("1fabric"));
        assert!(!re.is_match("fabric123"));
    }
}
