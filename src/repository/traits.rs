//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations can use SQLite, a key-value store, etc.

use async_trait::async_trait;
use crate::domain::{Contact, DomainResult, Entity, Form};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity (Conflict if the id is taken)
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: &T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity (NotFound if absent)
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: &T::Id) -> DomainResult<()>;
}

/// Extension for entities that belong to a campaign
#[async_trait]
pub trait CampaignScopedRepository<T: Entity>: Repository<T> {
    async fn list_by_campaign(&self, campaign_id: &str) -> DomainResult<Vec<T>>;
}

/// Contact lookups beyond plain CRUD
#[async_trait]
pub trait ContactRepository: Repository<Contact> {
    /// Contacts filed under `group_id`
    async fn list_by_group(&self, group_id: &str) -> DomainResult<Vec<Contact>>;

    /// Contacts matching `query` (see [`Contact::matches`])
    async fn search(&self, query: &str) -> DomainResult<Vec<Contact>>;
}

/// Durable storage of one form per campaign
///
/// Every backend normalizes field order on the way in and on the way out, so
/// callers never need to special-case which one is active.
#[async_trait]
pub trait FormGateway: Send + Sync {
    /// Stored form for the campaign, repaired if needed
    async fn load(&self, campaign_id: &str) -> DomainResult<Option<Form>>;

    /// Upsert the whole form; returns what was written
    async fn save(&self, form: &Form) -> DomainResult<Form>;

    /// Remove the campaign's form and every response referencing it
    async fn delete_campaign(&self, campaign_id: &str) -> DomainResult<()>;
}
