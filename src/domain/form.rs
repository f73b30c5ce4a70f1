//! Form Entity
//!
//! The ordered question list attached to one campaign.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use super::entity::{new_id, Entity};
use super::field::{Field, FieldType};
use super::labels::{default_options, Locale};
use super::ordering;

/// A campaign's survey form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    /// Owning campaign (opaque, supplied by the host)
    pub campaign_id: String,
    pub fields: Vec<Field>,
}

impl Form {
    pub fn new(campaign_id: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id: new_id(),
            campaign_id: campaign_id.into(),
            fields,
        }
    }

    /// Sort by stored order and reindex, so persisted data is self-consistent
    pub fn normalized(mut self) -> Self {
        ordering::normalize(&mut self.fields);
        self
    }
}

impl Entity for Form {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A field as found in storage: order and options may be missing
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Any JSON number; strings holding a number are accepted too
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Option<f64>,
}

/// Stored orders are only a sort key, so anything numeric is usable.
/// Values that are not finite numbers count as missing.
fn lenient_order<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let order = value.and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    Ok(order.filter(|order| order.is_finite()))
}

/// A form as found in storage, before repair
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: String,
    pub campaign_id: String,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

impl FormRecord {
    /// Repair whatever earlier writers left behind.
    ///
    /// Missing orders take the list position, fields are stable-sorted and
    /// reindexed, duplicate ids are replaced, and option lists are brought in
    /// line with the field type.
    pub fn into_form(self) -> Form {
        let mut seen = HashSet::new();

        let mut keyed: Vec<(f64, Field)> = self
            .fields
            .into_iter()
            .enumerate()
            .map(|(position, record)| {
                let id = if seen.insert(record.id.clone()) {
                    record.id
                } else {
                    let fresh = new_id();
                    log::warn!(
                        "Duplicate field id {} in form {}, reassigned to {}",
                        record.id, self.id, fresh
                    );
                    fresh
                };

                let options = match (record.kind.is_choice(), record.options) {
                    (true, Some(options)) if !options.is_empty() => Some(options),
                    (true, _) => Some(default_options(&Locale::En)),
                    (false, _) => None,
                };

                let key = record.order.unwrap_or(position as f64);
                let field = Field {
                    id,
                    kind: record.kind,
                    label: record.label,
                    required: record.required,
                    options,
                    order: 0,
                };
                (key, field)
            })
            .collect();

        // Stable: ties keep their stored relative position
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut fields: Vec<Field> = keyed.into_iter().map(|(_, field)| field).collect();
        ordering::resequence(&mut fields);

        Form {
            id: self.id,
            campaign_id: self.campaign_id,
            fields,
        }
    }
}

/// Parse a stored form and repair it
pub fn parse_stored_form(json: &str) -> Result<Form, serde_json::Error> {
    let record: FormRecord = serde_json::from_str(json)?;
    Ok(record.into_form())
}
