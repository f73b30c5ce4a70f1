//! Contact and group commands

use crate::domain::{Contact, Group};
use crate::AppState;

pub async fn list_groups(state: &AppState) -> Result<Vec<Group>, String> {
    state.groups.list().await.map_err(|e| e.to_string())
}

pub async fn create_group(state: &AppState, name: &str) -> Result<Group, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Group name cannot be empty".to_string());
    }

    let group = state.groups.create(&Group::new(name)).await.map_err(|e| e.to_string())?;
    log::info!("Created group {} ({})", group.name, group.id);
    Ok(group)
}

/// Delete a group and take it off every contact filed under it
pub async fn delete_group(state: &AppState, group_id: &str) -> Result<(), String> {
    let group_id = group_id.to_string();
    if state.groups.find_by_id(&group_id).await.map_err(|e| e.to_string())?.is_none() {
        return Err(format!("Group {} not found", group_id));
    }

    let members = state.contacts.list_by_group(&group_id).await.map_err(|e| e.to_string())?;
    for mut contact in members {
        contact.group_ids.retain(|id| id != &group_id);
        contact.touch();
        state.contacts.update(&contact).await.map_err(|e| e.to_string())?;
    }

    state.groups.delete(&group_id).await.map_err(|e| e.to_string())?;
    log::info!("Deleted group {}", group_id);
    Ok(())
}

/// Insert or replace a contact, stamping `updated_at`
///
/// Every group id must name an existing group.
pub async fn save_contact(state: &AppState, mut contact: Contact) -> Result<Contact, String> {
    for group_id in &contact.group_ids {
        if state.groups.find_by_id(group_id).await.map_err(|e| e.to_string())?.is_none() {
            return Err(format!("Group {} not found", group_id));
        }
    }

    contact.touch();
    let exists = state
        .contacts
        .find_by_id(&contact.id)
        .await
        .map_err(|e| e.to_string())?
        .is_some();
    let saved = if exists {
        state.contacts.update(&contact).await
    } else {
        state.contacts.create(&contact).await
    }
    .map_err(|e| e.to_string())?;

    log::debug!("Saved contact {}", saved.id);
    Ok(saved)
}

pub async fn add_contact(
    state: &AppState,
    name: &str,
    email: &str,
    phone: &str,
    group_ids: Vec<String>,
    company: Option<String>,
    tags: Vec<String>,
) -> Result<Contact, String> {
    if name.trim().is_empty() {
        return Err("Contact name cannot be empty".to_string());
    }

    let mut contact = Contact::new(name.trim(), email.trim(), phone.trim());
    contact.group_ids = group_ids;
    contact.company = company.filter(|c| !c.trim().is_empty());
    contact.tags = tags;
    save_contact(state, contact).await
}

/// Every contact, or only the members of `group_id`
pub async fn list_contacts(state: &AppState, group_id: Option<&str>) -> Result<Vec<Contact>, String> {
    let contacts = match group_id {
        Some(group_id) => state.contacts.list_by_group(group_id).await,
        None => state.contacts.list().await,
    };
    contacts.map_err(|e| e.to_string())
}

pub async fn search_contacts(state: &AppState, query: &str) -> Result<Vec<Contact>, String> {
    state.contacts.search(query).await.map_err(|e| e.to_string())
}

pub async fn delete_contact(state: &AppState, contact_id: &str) -> Result<(), String> {
    state
        .contacts
        .delete(&contact_id.to_string())
        .await
        .map_err(|e| e.to_string())
}
