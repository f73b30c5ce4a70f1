//! NPS Form Builder
//!
//! Layered architecture:
//! - domain: Fields, forms, responses, contacts and the ordering rules
//! - repository: Persistence gateway with local and SQLite backends
//! - editor: Field list editing sessions with write-through saves
//! - commands: Host command handlers
//! - config: Host configuration

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod domain;
pub mod editor;
pub mod repository;

use config::{AppConfig, BackendKind};
use domain::{DomainResult, FieldLabels, Group, Locale, NpsResponse};
use repository::{
    CampaignScopedRepository, ContactRepository, FileKv, FormGateway, LocalFormStore, MemoryKv,
    Repository, SqliteFormStore,
};

/// Application state shared across commands
#[derive(Clone)]
pub struct AppState {
    pub forms: Arc<dyn FormGateway>,
    pub responses: Arc<dyn CampaignScopedRepository<NpsResponse>>,
    pub contacts: Arc<dyn ContactRepository>,
    pub groups: Arc<dyn Repository<Group>>,
    pub labels: Arc<dyn FieldLabels>,
}

impl AppState {
    /// Open the backend named by `config`
    pub fn from_config(config: &AppConfig) -> DomainResult<Self> {
        let labels: Arc<dyn FieldLabels> = Arc::new(config.locale);
        match config.backend {
            BackendKind::Local => {
                let kv = FileKv::open(&config.data_dir)?;
                log::info!("Using local storage in {}", config.data_dir.display());
                Ok(Self::with_store(LocalFormStore::new(kv, config.namespace.clone()), labels))
            }
            BackendKind::Sqlite => {
                let db_path = config.db_path();
                let store = SqliteFormStore::open(&db_path)?;
                log::info!("Using SQLite database {}", db_path.display());
                Ok(Self::with_store(store, labels))
            }
        }
    }

    /// Volatile state, nothing touches the disk
    pub fn in_memory(locale: Locale) -> Self {
        Self::with_store(LocalFormStore::new(MemoryKv::new(), "nps"), Arc::new(locale))
    }

    fn with_store<S>(store: S, labels: Arc<dyn FieldLabels>) -> Self
    where
        S: FormGateway
            + CampaignScopedRepository<NpsResponse>
            + ContactRepository
            + Repository<Group>
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            forms: store.clone(),
            responses: store.clone(),
            contacts: store.clone(),
            groups: store,
            labels,
        }
    }
}
