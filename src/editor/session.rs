//! Field List Editor
//!
//! One editing session over a campaign's form. Every mutation updates the
//! in-memory list synchronously and then writes the whole form through the
//! session's [`SaveQueue`]; drag reorders are written one scheduler tick later.
//! Saves never block the caller and never roll back the local change.

use std::sync::Arc;

use crate::domain::{new_id, DomainResult, Field, FieldLabels, FieldPatch, FieldType, Form};
use crate::repository::FormGateway;
use super::field_list::{EditResult, FieldList};
use super::save_queue::{SaveQueue, SaveState};

/// Called with the finalized form when the user commits
pub type CommitHook = Box<dyn FnMut(&Form) + Send>;

pub struct FieldListEditor {
    form_id: String,
    campaign_id: String,
    fields: FieldList,
    labels: Arc<dyn FieldLabels>,
    saves: SaveQueue,
    on_commit: Option<CommitHook>,
}

impl FieldListEditor {
    /// Load the campaign's form once and start a session over it
    ///
    /// Like [`initialize`](Self::initialize), needs a tokio runtime.
    pub async fn open(
        campaign_id: &str,
        gateway: Arc<dyn FormGateway>,
        labels: Arc<dyn FieldLabels>,
    ) -> DomainResult<Self> {
        let existing = gateway.load(campaign_id).await?;
        Ok(Self::initialize(campaign_id, existing, gateway, labels))
    }

    /// Start a session over `existing`, or over a fresh form holding the default NPS question
    ///
    /// Spawns the session's save task, so this must be called inside a tokio
    /// runtime; it panics otherwise.
    pub fn initialize(
        campaign_id: &str,
        existing: Option<Form>,
        gateway: Arc<dyn FormGateway>,
        labels: Arc<dyn FieldLabels>,
    ) -> Self {
        let (form_id, existing_fields) = match existing {
            Some(form) => (form.id, Some(form.fields)),
            None => (new_id(), None),
        };
        let fields = FieldList::initialize(existing_fields, labels.as_ref());
        log::debug!(
            "Editing form {} for campaign {} ({} fields)",
            form_id,
            campaign_id,
            fields.len()
        );

        Self {
            form_id,
            campaign_id: campaign_id.to_string(),
            fields,
            labels,
            saves: SaveQueue::spawn(gateway),
            on_commit: None,
        }
    }

    /// Register the host's commit callback
    pub fn on_commit(mut self, hook: impl FnMut(&Form) + Send + 'static) -> Self {
        self.on_commit = Some(Box::new(hook));
        self
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    pub fn fields(&self) -> &[Field] {
        self.fields.fields()
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Current state as a form record
    pub fn snapshot(&self) -> Form {
        Form {
            id: self.form_id.clone(),
            campaign_id: self.campaign_id.clone(),
            fields: self.fields.fields().to_vec(),
        }
    }

    /// Append a field with default text; returns the new id
    pub fn add_field(&mut self, kind: FieldType) -> String {
        let id = self.fields.add(kind, self.labels.as_ref());
        self.write_through();
        id
    }

    pub fn remove_field(&mut self, id: &str) -> EditResult {
        let result = self.fields.remove(id);
        self.after(result)
    }

    pub fn update_field(&mut self, id: &str, patch: FieldPatch) -> EditResult {
        let result = self.fields.update(id, patch, self.labels.as_ref());
        self.after(result)
    }

    pub fn add_option(&mut self, field_id: &str) -> EditResult {
        let result = self.fields.add_option(field_id, self.labels.as_ref());
        self.after(result)
    }

    pub fn update_option(&mut self, field_id: &str, index: usize, value: impl Into<String>) -> EditResult {
        let result = self.fields.update_option(field_id, index, value);
        self.after(result)
    }

    pub fn remove_option(&mut self, field_id: &str, index: usize) -> EditResult {
        let result = self.fields.remove_option(field_id, index);
        self.after(result)
    }

    /// Drag-and-drop move; persisted after the current update cycle
    pub fn reorder(&mut self, source_index: usize, destination_index: usize) -> bool {
        if !self.fields.reorder(source_index, destination_index) {
            return false;
        }
        log::debug!("Moved field from index {} to {}", source_index, destination_index);
        let form = self.snapshot();
        self.saves.enqueue_deferred(form);
        true
    }

    /// Final save; hands the finalized form to the host
    pub fn commit(&mut self) -> Form {
        let form = self.snapshot();
        self.saves.enqueue(form.clone());
        if let Some(hook) = self.on_commit.as_mut() {
            hook(&form);
        }
        form
    }

    pub fn save_state(&self) -> SaveState {
        self.saves.state()
    }

    /// Saves that failed and were abandoned during this session
    pub fn failed_saves(&self) -> u64 {
        self.saves.failures()
    }

    /// Wait for every save enqueued so far to settle
    pub async fn flush(&self) {
        self.saves.flush().await;
    }

    /// Flush and end the session
    pub async fn close(self) {
        self.saves.close().await;
    }

    fn after(&mut self, result: EditResult) -> EditResult {
        if let Err(reason) = &result {
            log::debug!("Edit rejected for form {}: {}", self.form_id, reason);
        }
        if result == Ok(true) {
            self.write_through();
        }
        result
    }

    fn write_through(&mut self) {
        let form = self.snapshot();
        self.saves.enqueue(form);
    }
}
