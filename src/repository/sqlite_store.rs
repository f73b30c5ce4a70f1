//! SQLite Form Store
//!
//! Database-backed implementation of the form gateway and the response,
//! contact and group repositories.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tokio::sync::Mutex;

use crate::domain::{
    validate_score, Contact, DomainError, DomainResult, FieldRecord, Form, FormRecord, Group, NpsResponse,
};
use super::db::init_db;
use super::traits::{CampaignScopedRepository, ContactRepository, FormGateway, Repository};

const RESPONSE_COLUMNS: &str = "id, campaign_id, score, feedback, form_responses, created_at";
const CONTACT_COLUMNS: &str =
    "id, name, email, phone, group_ids, company, position, tags, notes, created_at, updated_at";

pub struct SqliteFormStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFormStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn open(db_path: &Path) -> DomainResult<Self> {
        let conn = init_db(db_path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    pub fn in_memory() -> DomainResult<Self> {
        Self::open(Path::new(":memory:"))
    }
}

/// Raw response row, decoded outside the rusqlite closure
struct ResponseRow {
    id: String,
    campaign_id: String,
    score: i64,
    feedback: Option<String>,
    form_responses: String,
    created_at: String,
}

fn read_response_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRow> {
    Ok(ResponseRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        score: row.get(2)?,
        feedback: row.get(3)?,
        form_responses: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Convert a database row to NpsResponse
fn row_to_response(row: ResponseRow) -> DomainResult<NpsResponse> {
    let score = u8::try_from(row.score)
        .map_err(|_| DomainError::Internal(format!("Response {} has invalid score {}", row.id, row.score)))?;
    let form_responses = serde_json::from_str(&row.form_responses)
        .map_err(|e| DomainError::Internal(format!("Response {} has invalid answers: {}", row.id, e)))?;

    Ok(NpsResponse {
        id: row.id,
        campaign_id: row.campaign_id,
        score,
        feedback: row.feedback,
        form_responses,
        created_at: row.created_at,
    })
}

fn query_responses(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> DomainResult<Vec<NpsResponse>> {
    let mut stmt = conn.prepare(sql).map_err(|e| DomainError::Internal(e.to_string()))?;
    let rows = stmt
        .query_map(params, read_response_row)
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    let mut responses = Vec::new();
    for row in rows {
        let row = row.map_err(|e| DomainError::Internal(e.to_string()))?;
        responses.push(row_to_response(row)?);
    }
    Ok(responses)
}

/// Map a failed INSERT, turning a taken primary key into `Conflict`
fn insert_error(e: rusqlite::Error, what: &str, id: &str) -> DomainError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            DomainError::Conflict(format!("{} {} already exists", what, id))
        }
        other => DomainError::Internal(other.to_string()),
    }
}

struct ContactRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    group_ids: String,
    company: Option<String>,
    position: Option<String>,
    tags: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        group_ids: row.get(4)?,
        company: row.get(5)?,
        position: row.get(6)?,
        tags: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_contact(row: ContactRow) -> DomainResult<Contact> {
    let group_ids = serde_json::from_str(&row.group_ids)
        .map_err(|e| DomainError::Internal(format!("Contact {} has invalid groups: {}", row.id, e)))?;
    let tags = serde_json::from_str(&row.tags)
        .map_err(|e| DomainError::Internal(format!("Contact {} has invalid tags: {}", row.id, e)))?;

    Ok(Contact {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        group_ids,
        company: row.company,
        position: row.position,
        tags,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn query_contacts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> DomainResult<Vec<Contact>> {
    let mut stmt = conn.prepare(sql).map_err(|e| DomainError::Internal(e.to_string()))?;
    let rows = stmt
        .query_map(params, read_contact_row)
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    let mut contacts = Vec::new();
    for row in rows {
        let row = row.map_err(|e| DomainError::Internal(e.to_string()))?;
        contacts.push(row_to_contact(row)?);
    }
    Ok(contacts)
}

/// JSON-encoded list columns of a contact
fn contact_lists(contact: &Contact) -> DomainResult<(String, String)> {
    let group_ids = serde_json::to_string(&contact.group_ids).map_err(|e| DomainError::Internal(e.to_string()))?;
    let tags = serde_json::to_string(&contact.tags).map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok((group_ids, tags))
}

#[async_trait]
impl FormGateway for SqliteFormStore {
    async fn load(&self, campaign_id: &str) -> DomainResult<Option<Form>> {
        let conn = self.conn.lock().await;

        let row = conn
            .query_row(
                "SELECT id, fields FROM campaign_forms WHERE campaign_id = ?1",
                params![campaign_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let Some((id, fields_json)) = row else {
            log::debug!("No form found for campaign {}", campaign_id);
            return Ok(None);
        };

        let fields: Vec<FieldRecord> = serde_json::from_str(&fields_json).map_err(|e| {
            DomainError::Internal(format!("Invalid stored form for campaign {}: {}", campaign_id, e))
        })?;
        let form = FormRecord {
            id,
            campaign_id: campaign_id.to_string(),
            fields,
        }
        .into_form();

        log::debug!("Loaded form for campaign {} with {} fields", campaign_id, form.fields.len());
        Ok(Some(form))
    }

    async fn save(&self, form: &Form) -> DomainResult<Form> {
        let form = form.clone().normalized();
        let fields_json = serde_json::to_string(&form.fields).map_err(|e| DomainError::Internal(e.to_string()))?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO campaign_forms (campaign_id, id, fields, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(campaign_id) DO UPDATE SET
                id = excluded.id,
                fields = excluded.fields,
                updated_at = excluded.updated_at",
            params![
                form.campaign_id,
                form.id,
                fields_json,
                chrono::Utc::now().timestamp_millis()
            ],
        )
        .map_err(|e| DomainError::Internal(e.to_string()))?;

        log::debug!("Saved form for campaign {} with {} fields", form.campaign_id, form.fields.len());
        Ok(form)
    }

    async fn delete_campaign(&self, campaign_id: &str) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;

        // Manual cascade: responses first, then the form, in one transaction
        let tx = conn.transaction().map_err(|e| DomainError::Internal(e.to_string()))?;
        let removed = tx
            .execute("DELETE FROM nps_responses WHERE campaign_id = ?1", params![campaign_id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        tx.execute("DELETE FROM campaign_forms WHERE campaign_id = ?1", params![campaign_id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        tx.commit().map_err(|e| DomainError::Internal(e.to_string()))?;

        log::debug!("Deleted campaign {} data ({} responses)", campaign_id, removed);
        Ok(())
    }
}

#[async_trait]
impl Repository<NpsResponse> for SqliteFormStore {
    async fn create(&self, entity: &NpsResponse) -> DomainResult<NpsResponse> {
        validate_score(entity.score)?;
        let answers = serde_json::to_string(&entity.form_responses).map_err(|e| DomainError::Internal(e.to_string()))?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO nps_responses (id, campaign_id, score, feedback, form_responses, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entity.id,
                entity.campaign_id,
                entity.score as i64,
                entity.feedback,
                answers,
                entity.created_at
            ],
        )
        .map_err(|e| insert_error(e, "Response", &entity.id))?;

        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<NpsResponse>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM nps_responses WHERE id = ?1", RESPONSE_COLUMNS);
        Ok(query_responses(&conn, &sql, params![id])?.into_iter().next())
    }

    async fn list(&self) -> DomainResult<Vec<NpsResponse>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM nps_responses ORDER BY created_at, rowid", RESPONSE_COLUMNS);
        query_responses(&conn, &sql, [])
    }

    async fn update(&self, entity: &NpsResponse) -> DomainResult<NpsResponse> {
        validate_score(entity.score)?;
        let answers = serde_json::to_string(&entity.form_responses).map_err(|e| DomainError::Internal(e.to_string()))?;
        let conn = self.conn.lock().await;

        let changed = conn
            .execute(
                "UPDATE nps_responses SET campaign_id = ?1, score = ?2, feedback = ?3, form_responses = ?4, created_at = ?5
                 WHERE id = ?6",
                params![
                    entity.campaign_id,
                    entity.score as i64,
                    entity.feedback,
                    answers,
                    entity.created_at,
                    entity.id
                ],
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Response {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM nps_responses WHERE id = ?1", params![id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CampaignScopedRepository<NpsResponse> for SqliteFormStore {
    async fn list_by_campaign(&self, campaign_id: &str) -> DomainResult<Vec<NpsResponse>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM nps_responses WHERE campaign_id = ?1 ORDER BY created_at, rowid",
            RESPONSE_COLUMNS
        );
        query_responses(&conn, &sql, params![campaign_id])
    }
}

#[async_trait]
impl Repository<Contact> for SqliteFormStore {
    async fn create(&self, entity: &Contact) -> DomainResult<Contact> {
        let (group_ids, tags) = contact_lists(entity)?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO contacts (id, name, email, phone, group_ids, company, position, tags, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entity.id,
                entity.name,
                entity.email,
                entity.phone,
                group_ids,
                entity.company,
                entity.position,
                tags,
                entity.notes,
                entity.created_at,
                entity.updated_at
            ],
        )
        .map_err(|e| insert_error(e, "Contact", &entity.id))?;

        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<Contact>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM contacts WHERE id = ?1", CONTACT_COLUMNS);
        Ok(query_contacts(&conn, &sql, params![id])?.into_iter().next())
    }

    async fn list(&self) -> DomainResult<Vec<Contact>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM contacts ORDER BY rowid", CONTACT_COLUMNS);
        query_contacts(&conn, &sql, [])
    }

    async fn update(&self, entity: &Contact) -> DomainResult<Contact> {
        let (group_ids, tags) = contact_lists(entity)?;
        let conn = self.conn.lock().await;

        let changed = conn
            .execute(
                "UPDATE contacts SET name = ?1, email = ?2, phone = ?3, group_ids = ?4, company = ?5,
                    position = ?6, tags = ?7, notes = ?8, created_at = ?9, updated_at = ?10
                 WHERE id = ?11",
                params![
                    entity.name,
                    entity.email,
                    entity.phone,
                    group_ids,
                    entity.company,
                    entity.position,
                    tags,
                    entity.notes,
                    entity.created_at,
                    entity.updated_at,
                    entity.id
                ],
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Contact {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM contacts WHERE id = ?1", params![id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for SqliteFormStore {
    async fn list_by_group(&self, group_id: &str) -> DomainResult<Vec<Contact>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM contacts
             WHERE EXISTS (SELECT 1 FROM json_each(contacts.group_ids) WHERE json_each.value = ?1)
             ORDER BY rowid",
            CONTACT_COLUMNS
        );
        query_contacts(&conn, &sql, params![group_id])
    }

    async fn search(&self, query: &str) -> DomainResult<Vec<Contact>> {
        // SQL LOWER() only folds ASCII, so matching happens in Rust
        let contacts = Repository::<Contact>::list(self).await?;
        Ok(contacts.into_iter().filter(|c| c.matches(query)).collect())
    }
}

#[async_trait]
impl Repository<Group> for SqliteFormStore {
    async fn create(&self, entity: &Group) -> DomainResult<Group> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO contact_groups (id, name) VALUES (?1, ?2)",
            params![entity.id, entity.name],
        )
        .map_err(|e| insert_error(e, "Group", &entity.id))?;
        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<Group>> {
        let conn = self.conn.lock().await;
        let group = conn
            .query_row(
                "SELECT id, name FROM contact_groups WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(group)
    }

    async fn list(&self) -> DomainResult<Vec<Group>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, name FROM contact_groups ORDER BY rowid")
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let groups = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(groups)
    }

    async fn update(&self, entity: &Group) -> DomainResult<Group> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE contact_groups SET name = ?1 WHERE id = ?2",
                params![entity.name, entity.id],
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Group {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: &String) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM contact_groups WHERE id = ?1", params![id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(())
    }
}
