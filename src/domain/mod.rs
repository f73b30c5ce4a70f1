//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer does no I/O.

mod contact;
mod entity;
mod field;
mod form;
mod labels;
mod response;
pub mod ordering;

pub use contact::{Contact, Group};
pub use entity::{new_id, Entity, DomainError, DomainResult};
pub use field::{Field, FieldPatch, FieldType};
pub use form::{parse_stored_form, FieldRecord, Form, FormRecord};
pub use labels::{default_options, FieldLabels, Locale};
pub use response::{validate_score, NpsResponse, NpsSummary, ScoreCategory, MAX_SCORE};
