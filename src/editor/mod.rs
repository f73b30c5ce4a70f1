//! Editor Layer
//!
//! In-memory form editing with write-through persistence:
//! - field_list: ordered field collection and its invariants
//! - save_queue: background writer, one in-flight save per session
//! - session: FieldListEditor tying the two together

mod field_list;
mod save_queue;
mod session;

pub use field_list::{EditRejected, EditResult, FieldList};
pub use save_queue::{SaveQueue, SaveState};
pub use session::{CommitHook, FieldListEditor};
