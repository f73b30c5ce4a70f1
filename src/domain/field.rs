//! Field Entity
//!
//! One question of a survey form.

use serde::{Deserialize, Serialize};
use super::entity::{new_id, Entity};
use super::labels::{default_options, FieldLabels};

/// Field type determines how the question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text answer
    Text,
    /// Single choice from a dropdown
    Select,
    /// Single choice from buttons
    Radio,
    /// 0-10 recommendation score
    Nps,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Nps => "nps",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(FieldType::Text),
            "select" => Some(FieldType::Select),
            "radio" => Some(FieldType::Radio),
            "nps" => Some(FieldType::Nps),
            _ => None,
        }
    }

    /// Select and radio fields carry an option list
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question within a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Unique within the form, never changes once created
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub label: String,
    pub required: bool,
    /// Present only for choice fields, never empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Position within the form (0-based, dense)
    pub order: u32,
}

impl Field {
    /// Create a field with the locale's default text, appended at `order`
    pub fn new(kind: FieldType, order: u32, labels: &dyn FieldLabels) -> Self {
        Self {
            id: new_id(),
            kind,
            label: labels.default_label(kind),
            required: false,
            options: kind.is_choice().then(|| default_options(labels)),
            order,
        }
    }

    /// The required NPS question every new form starts with
    pub fn default_nps(labels: &dyn FieldLabels) -> Self {
        Self {
            required: true,
            ..Self::new(FieldType::Nps, 0, labels)
        }
    }

    pub fn is_nps(&self) -> bool {
        self.kind == FieldType::Nps
    }
}

impl Entity for Field {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Attribute changes for an existing field
///
/// Absent members are left untouched. Id and order are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn required(required: bool) -> Self {
        Self {
            required: Some(required),
            ..Self::default()
        }
    }

    pub fn kind(kind: FieldType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.label.is_none() && self.required.is_none() && self.options.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Locale;

    #[test]
    fn test_choice_field_creation() {
        let field = Field::new(FieldType::Select, 3, &Locale::En);
        assert_eq!(field.order, 3);
        assert!(!field.required);
        assert_eq!(field.label, "Select an option");
        assert_eq!(field.options, Some(vec!["Option 1".to_string(), "Option 2".to_string()]));
    }

    #[test]
    fn test_text_field_has_no_options() {
        let field = Field::new(FieldType::Text, 0, &Locale::En);
        assert!(field.options.is_none());
    }

    #[test]
    fn test_default_nps_is_required() {
        let field = Field::default_nps(&Locale::En);
        assert!(field.is_nps());
        assert!(field.required);
        assert_eq!(field.order, 0);
    }

    #[test]
    fn test_wire_shape() {
        let field = Field {
            id: "f1".to_string(),
            kind: FieldType::Text,
            label: "Why?".to_string(),
            required: false,
            options: None,
            order: 2,
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "f1", "type": "text", "label": "Why?", "required": false, "order": 2})
        );
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!(FieldType::parse("radio"), Some(FieldType::Radio));
        assert_eq!(FieldType::parse("checkbox"), None);
        assert!(FieldType::Radio.is_choice());
        assert!(!FieldType::Nps.is_choice());
    }
}
