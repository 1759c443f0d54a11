//! Form binding for the selected node.
//!
//! Every edit produces a complete updated [`NodeRecord`], wrapped as an
//! [`Intent::UpdateNode`] for the designer. Numeric fields that fail to parse
//! keep their previous value; there is no other validation.

use flowdeck_core::settings::{validate_settings, SettingIssue, SettingKind, SettingsSchema};
use flowdeck_core::types::{NodeRecord, NodeType};

use crate::designer::Intent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Label,
    Description,
    Timeout,
    RetryCount,
    Tags,
    /// A category-specific setting, by key.
    Setting(String),
}

/// One row of the form. `field` is `None` for read-only rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub field: Option<Field>,
    pub label: String,
    pub value: String,
}

impl FieldView {
    fn editable(field: Field, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            label: label.into(),
            value: value.into(),
        }
    }

    fn read_only(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: None,
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn is_editable(&self) -> bool {
        self.field.is_some()
    }
}

pub struct PropertyPanel<'a> {
    node: &'a NodeRecord,
    schema: Option<SettingsSchema>,
}

impl<'a> PropertyPanel<'a> {
    pub fn new(node: &'a NodeRecord, schema: Option<SettingsSchema>) -> Self {
        Self { node, schema }
    }

    pub fn node(&self) -> &NodeRecord {
        self.node
    }

    pub fn fields(&self) -> Vec<FieldView> {
        let node = self.node;
        let mut rows = vec![FieldView::read_only("Type", node.node_type.as_str())];

        if node.node_type == NodeType::Agent {
            rows.push(FieldView::read_only(
                "Agent",
                node.agent_name.clone().unwrap_or_default(),
            ));
            rows.push(FieldView::read_only(
                "Category",
                node.category_name.clone().unwrap_or_default(),
            ));
        }

        for (field, label) in [
            (Field::Label, "Label"),
            (Field::Description, "Description"),
            (Field::Timeout, "Timeout (s)"),
            (Field::RetryCount, "Retry count"),
            (Field::Tags, "Tags"),
        ] {
            let value = self.value_of(&field);
            rows.push(FieldView::editable(field, label, value));
        }

        if let Some(schema) = &self.schema {
            for setting in &schema.fields {
                let field = Field::Setting(setting.key.clone());
                let value = self.value_of(&field);
                rows.push(FieldView::editable(field, setting.display_label(), value));
            }
        }

        rows
    }

    /// Current text of a field, as it should appear in an input box.
    pub fn value_of(&self, field: &Field) -> String {
        let node = self.node;
        match field {
            Field::Label => node.label.clone(),
            Field::Description => node.description.clone(),
            Field::Timeout => node.timeout.to_string(),
            Field::RetryCount => node.retry_count.to_string(),
            Field::Tags => node.tags.join(", "),
            Field::Setting(key) => node
                .settings
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }

    /// The node with `raw` applied to `field`.
    pub fn apply(&self, field: &Field, raw: &str) -> NodeRecord {
        let mut node = self.node.clone();
        match field {
            Field::Label => node.label = raw.to_string(),
            Field::Description => node.description = raw.to_string(),
            Field::Timeout => node.timeout = parse_integer(raw, node.timeout),
            Field::RetryCount => node.retry_count = parse_integer(raw, node.retry_count),
            Field::Tags => node.tags = parse_tags(raw),
            Field::Setting(key) => {
                let kind = self
                    .schema
                    .as_ref()
                    .and_then(|s| s.field(key))
                    .map(|f| f.kind)
                    .unwrap_or(SettingKind::Text);
                if let Some(value) = kind.coerce(raw) {
                    node.settings.insert(key.clone(), value);
                }
            }
        }
        node
    }

    /// Edit a field and emit the update.
    pub fn edit(&self, field: &Field, raw: &str) -> Intent {
        Intent::UpdateNode(self.apply(field, raw))
    }

    /// Ask the designer to delete this node.
    pub fn delete_request(&self) -> Intent {
        Intent::DeleteNode(self.node.id.clone())
    }

    /// Schema mismatches of the node's settings. Advisory only.
    pub fn issues(&self) -> Vec<SettingIssue> {
        match &self.schema {
            Some(schema) => validate_settings(schema, &self.node.settings),
            None => vec![],
        }
    }
}

/// Parse an integer field, keeping `previous` when the input is not a number.
pub fn parse_integer(raw: &str, previous: i64) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(previous)
}

/// Split comma-separated tags, trimming and dropping empties. Order is kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
