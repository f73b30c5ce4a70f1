//! Contacts and Groups
//!
//! The people a campaign is sent to, filed into named groups.

use serde::{Deserialize, Serialize};
use super::entity::{new_id, Entity};

/// A named bucket of contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
        }
    }
}

impl Entity for Group {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Groups the contact belongs to; a contact may sit in several
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: new_id(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            group_ids: Vec::new(),
            company: None,
            position: None,
            tags: Vec::new(),
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn in_group(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|id| id == group_id)
    }

    /// Stamp `updated_at` with the current time
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Case-insensitive substring match on name, email, company and tags.
    /// The phone number is matched verbatim.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&needle);

        contains(self.name.as_str())
            || contains(self.email.as_str())
            || self.phone.contains(query)
            || self.company.as_deref().is_some_and(contains)
            || self.tags.iter().any(|tag| contains(tag.as_str()))
    }
}

impl Entity for Contact {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
