//! Category-specific node settings.
//!
//! Settings are an open map of typed values. Which keys a node should carry is
//! decided by a [`SettingsSchema`] supplied by the agent-config collaborator;
//! the editor only checks values against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Bool(_) => SettingKind::Bool,
            Self::Number(_) => SettingKind::Number,
            Self::Text(_) => SettingKind::Text,
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Text,
    Number,
    Bool,
}

impl SettingKind {
    /// Parse raw form input into a value of this kind.
    ///
    /// Returns `None` when the input does not fit the kind.
    pub fn coerce(self, raw: &str) -> Option<SettingValue> {
        let trimmed = raw.trim();
        match self {
            Self::Text => Some(SettingValue::Text(raw.to_string())),
            Self::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(SettingValue::Number),
            Self::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Some(SettingValue::Bool(true)),
                "false" | "no" | "0" | "off" => Some(SettingValue::Bool(false)),
                _ => None,
            },
        }
    }
}

/// One field of a settings schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingField {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: SettingKind,
    #[serde(default)]
    pub required: bool,
}

impl SettingField {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

/// Settings layout for all agents of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub category_id: String,
    #[serde(default)]
    pub fields: Vec<SettingField>,
}

impl SettingsSchema {
    pub fn field(&self, key: &str) -> Option<&SettingField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// A mismatch between a settings map and its schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingIssue {
    Missing { key: String },
    WrongKind {
        key: String,
        expected: SettingKind,
        found: SettingKind,
    },
    Unknown { key: String },
}

impl std::fmt::Display for SettingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "required setting '{}' is missing", key),
            Self::WrongKind { key, expected, found } => write!(
                f,
                "setting '{}' should be {:?} but is {:?}",
                key, expected, found
            ),
            Self::Unknown { key } => write!(f, "setting '{}' is not in the schema", key),
        }
    }
}

/// Check a settings map against a schema. Issues are advisory.
pub fn validate_settings(
    schema: &SettingsSchema,
    settings: &BTreeMap<String, SettingValue>,
) -> Vec<SettingIssue> {
    let mut issues = Vec::new();

    for field in &schema.fields {
        match settings.get(&field.key) {
            None if field.required => issues.push(SettingIssue::Missing {
                key: field.key.clone(),
            }),
            Some(value) if value.kind() != field.kind => issues.push(SettingIssue::WrongKind {
                key: field.key.clone(),
                expected: field.kind,
                found: value.kind(),
            }),
            _ => {}
        }
    }

    for key in settings.keys() {
        if schema.field(key).is_none() {
            issues.push(SettingIssue::Unknown { key: key.clone() });
        }
    }

    issues
}
