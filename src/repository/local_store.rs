//! Local Form Store
//!
//! Forms, responses and contacts kept as JSON values in a synchronous
//! key-value store, laid out like the browser's local storage:
//! - `{ns}/forms_{campaignId}`: one form per campaign
//! - `{ns}/responses`: every response, as one array
//! - `{ns}/contacts` and `{ns}/groups`: the address book

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::{
    parse_stored_form, validate_score, Contact, DomainError, DomainResult, Entity, Form, Group,
    NpsResponse,
};
use super::kv::KeyValueStore;
use super::traits::{CampaignScopedRepository, ContactRepository, FormGateway, Repository};

const RESPONSES: &str = "responses";
const CONTACTS: &str = "contacts";
const GROUPS: &str = "groups";

pub struct LocalFormStore<K: KeyValueStore> {
    kv: K,
    namespace: String,
    /// Serializes read-modify-write cycles on the stored arrays
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> LocalFormStore<K> {
    pub fn new(kv: K, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn form_key(&self, campaign_id: &str) -> String {
        format!("{}/forms_{}", self.namespace, campaign_id)
    }

    fn list_key(&self, name: &str) -> String {
        format!("{}/{}", self.namespace, name)
    }

    fn read_list<T: DeserializeOwned>(&self, name: &str) -> DomainResult<Vec<T>> {
        match self.kv.get(&self.list_key(name))? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| DomainError::Internal(format!("Invalid stored {}: {}", name, e))),
            None => Ok(Vec::new()),
        }
    }

    fn write_list<T: Serialize>(&self, name: &str, items: &[T]) -> DomainResult<()> {
        let json = serde_json::to_string(items).map_err(|e| DomainError::Internal(e.to_string()))?;
        self.kv.set(&self.list_key(name), &json)
    }

    async fn insert<T>(&self, name: &str, entity: &T) -> DomainResult<T>
    where
        T: Entity<Id = String> + Serialize + DeserializeOwned,
    {
        let _guard = self.write_lock.lock().await;

        let mut items: Vec<T> = self.read_list(name)?;
        if items.iter().any(|item| item.id() == entity.id()) {
            return Err(DomainError::Conflict(format!("{} already exists in {}", entity.id(), name)));
        }
        items.push(entity.clone());
        self.write_list(name, &items)?;
        Ok(entity.clone())
    }

    async fn replace<T>(&self, name: &str, entity: &T) -> DomainResult<T>
    where
        T: Entity<Id = String> + Serialize + DeserializeOwned,
    {
        let _guard = self.write_lock.lock().await;

        let mut items: Vec<T> = self.read_list(name)?;
        let existing = items
            .iter_mut()
            .find(|item| item.id() == entity.id())
            .ok_or_else(|| DomainError::NotFound(format!("{} not found in {}", entity.id(), name)))?;
        *existing = entity.clone();
        self.write_list(name, &items)?;
        Ok(entity.clone())
    }

    async fn remove<T>(&self, name: &str, id: &str) -> DomainResult<()>
    where
        T: Entity<Id = String> + Serialize + DeserializeOwned,
    {
        let _guard = self.write_lock.lock().await;

        let mut items: Vec<T> = self.read_list(name)?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() != before {
            self.write_list(name, &items)?;
        }
        Ok(())
    }

    fn find<T>(&self, name: &str, id: &str) -> DomainResult<Option<T>>
    where
        T: Entity<Id = String> + DeserializeOwned,
    {
        Ok(self.read_list::<T>(name)?.into_iter().find(|item| item.id() == id))
    }
}

#[async_trait]
impl<K: KeyValueStore> FormGateway for LocalFormStore<K> {
    async fn load(&self, campaign_id: &str) -> DomainResult<Option<Form>> {
        let Some(json) = self.kv.get(&self.form_key(campaign_id))? else {
            log::debug!("No form found for campaign {}", campaign_id);
            return Ok(None);
        };

        let form = parse_stored_form(&json).map_err(|e| {
            DomainError::Internal(format!("Invalid stored form for campaign {}: {}", campaign_id, e))
        })?;
        log::debug!("Loaded form for campaign {} with {} fields", campaign_id, form.fields.len());
        Ok(Some(form))
    }

    async fn save(&self, form: &Form) -> DomainResult<Form> {
        let form = form.clone().normalized();
        let json = serde_json::to_string(&form).map_err(|e| DomainError::Internal(e.to_string()))?;
        self.kv.set(&self.form_key(&form.campaign_id), &json)?;

        log::debug!("Saved form for campaign {} with {} fields", form.campaign_id, form.fields.len());
        Ok(form)
    }

    async fn delete_campaign(&self, campaign_id: &str) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;

        // A corrupt responses array must leave the campaign untouched
        let mut responses: Vec<NpsResponse> = self.read_list(RESPONSES)?;
        let before = responses.len();
        responses.retain(|r| r.campaign_id != campaign_id);
        if responses.len() != before {
            self.write_list(RESPONSES, &responses)?;
        }

        self.kv.remove(&self.form_key(campaign_id))?;

        log::debug!(
            "Deleted campaign {} data ({} responses)",
            campaign_id,
            before - responses.len()
        );
        Ok(())
    }
}

#[async_trait]
impl<K: KeyValueStore> Repository<NpsResponse> for LocalFormStore<K> {
    async fn create(&self, entity: &NpsResponse) -> DomainResult<NpsResponse> {
        validate_score(entity.score)?;
        self.insert(RESPONSES, entity).await
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<NpsResponse>> {
        self.find(RESPONSES, id)
    }

    async fn list(&self) -> DomainResult<Vec<NpsResponse>> {
        self.read_list(RESPONSES)
    }

    async fn update(&self, entity: &NpsResponse) -> DomainResult<NpsResponse> {
        validate_score(entity.score)?;
        self.replace(RESPONSES, entity).await
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        self.remove::<NpsResponse>(RESPONSES, id).await
    }
}

#[async_trait]
impl<K: KeyValueStore> CampaignScopedRepository<NpsResponse> for LocalFormStore<K> {
    async fn list_by_campaign(&self, campaign_id: &str) -> DomainResult<Vec<NpsResponse>> {
        Ok(self
            .read_list::<NpsResponse>(RESPONSES)?
            .into_iter()
            .filter(|r| r.campaign_id == campaign_id)
            .collect())
    }
}

#[async_trait]
impl<K: KeyValueStore> Repository<Contact> for LocalFormStore<K> {
    async fn create(&self, entity: &Contact) -> DomainResult<Contact> {
        self.insert(CONTACTS, entity).await
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<Contact>> {
        self.find(CONTACTS, id)
    }

    async fn list(&self) -> DomainResult<Vec<Contact>> {
        self.read_list(CONTACTS)
    }

    async fn update(&self, entity: &Contact) -> DomainResult<Contact> {
        self.replace(CONTACTS, entity).await
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        self.remove::<Contact>(CONTACTS, id).await
    }
}

#[async_trait]
impl<K: KeyValueStore> ContactRepository for LocalFormStore<K> {
    async fn list_by_group(&self, group_id: &str) -> DomainResult<Vec<Contact>> {
        Ok(self
            .read_list::<Contact>(CONTACTS)?
            .into_iter()
            .filter(|c| c.in_group(group_id))
            .collect())
    }

    async fn search(&self, query: &str) -> DomainResult<Vec<Contact>> {
        Ok(self
            .read_list::<Contact>(CONTACTS)?
            .into_iter()
            .filter(|c| c.matches(query))
            .collect())
    }
}

#[async_trait]
impl<K: KeyValueStore> Repository<Group> for LocalFormStore<K> {
    async fn create(&self, entity: &Group) -> DomainResult<Group> {
        self.insert(GROUPS, entity).await
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<Group>> {
        self.find(GROUPS, id)
    }

    async fn list(&self) -> DomainResult<Vec<Group>> {
        self.read_list(GROUPS)
    }

    async fn update(&self, entity: &Group) -> DomainResult<Group> {
        self.replace(GROUPS, entity).await
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        self.remove::<Group>(GROUPS, id).await
    }
}
