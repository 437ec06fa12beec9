//! HTTP request handlers.

pub mod changes;
pub mod common;
pub mod cursor;
pub mod health;
pub mod links;
pub mod slices;

pub use changes::list_changes;
pub use cursor::{get_cursor, set_cursor};
pub use health::{diag, health_check, root};
pub use links::shared_link;
pub use slices::{ensure_slices, split_audio_upload};
