//! Synthesized CloudFormation templates and assertions over them.
//!
//! A [`Template`] is what [`Stack::to_template`](crate::Stack::to_template)
//! produces and what gets written to `<Stack>.template.json`. It also serves
//! as the test-facing assertion API: resources can be counted and matched by
//! type, with property matching done through [`object_like`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CdkResult;

/// A CloudFormation template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Stack description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Template parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    /// Template rules.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub rules: Map<String, Value>,
    /// Resources keyed by logical ID.
    #[serde(default)]
    pub resources: Map<String, Value>,
    /// Outputs keyed by logical ID.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub outputs: Map<String, Value>,
}

impl Template {
    /// Parse a template from JSON text.
    pub fn from_json(json: &str) -> CdkResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> CdkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a resource by logical ID.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// All resources of the given type, as `(logical_id, resource)` pairs.
    #[must_use]
    pub fn find_resources(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    /// Number of resources of the given type.
    #[must_use]
    pub fn resource_count(&self, resource_type: &str) -> usize {
        self.find_resources(resource_type).len()
    }

    /// Whether at least one resource of the given type exists.
    #[must_use]
    pub fn has_resource(&self, resource_type: &str) -> bool {
        self.resource_count(resource_type) > 0
    }

    /// Whether a resource of the given type has properties matching `expected`.
    #[must_use]
    pub fn has_resource_properties(&self, resource_type: &str, expected: &Value) -> bool {
        self.find_resources(resource_type)
            .into_iter()
            .any(|(_, r)| object_like(r.get("Properties").unwrap_or(&Value::Null), expected))
    }

    /// Properties of the single resource of the given type.
    ///
    /// Returns `None` when there are zero or several such resources.
    #[must_use]
    pub fn single_resource_properties(&self, resource_type: &str) -> Option<&Value> {
        match self.find_resources(resource_type).as_slice() {
            [(_, r)] => r.get("Properties"),
            _ => None,
        }
    }

    /// Look up an output by logical ID.
    #[must_use]
    pub fn output(&self, logical_id: &str) -> Option<&Value> {
        self.outputs.get(logical_id)
    }

    /// Export names declared by the outputs, sorted.
    #[must_use]
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .outputs
            .values()
            .filter_map(|o| o.pointer("/Export/Name").and_then(Value::as_str))
            .collect();
        names.sort_unstable();
        names
    }

    /// The output exported under `export_name`.
    #[must_use]
    pub fn output_by_export(&self, export_name: &str) -> Option<&Value> {
        self.outputs
            .values()
            .find(|o| o.pointer("/Export/Name").and_then(Value::as_str) == Some(export_name))
    }
}

/// Deep partial match: `expected` must be contained in `actual`.
///
/// Objects match when every expected key matches (extra actual keys are
/// ignored); arrays must have equal length and match element-wise; scalars
/// must be equal.
#[must_use]
pub fn object_like(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| object_like(a, v))),
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual.iter().zip(expected).all(|(a, e)| object_like(a, e))
        }
        _ => actual == expected,
    }
}
