//! Commands Layer
//!
//! Host command handlers that bridge the user interface to the editor and the
//! persistence gateway. Errors cross this boundary as strings.

mod contact_cmd;
mod form_cmd;
mod response_cmd;

pub use contact_cmd::*;
pub use form_cmd::*;
pub use response_cmd::*;
