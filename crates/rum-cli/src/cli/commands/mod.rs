//! CLI command handlers. Each command is in its own file.

mod abort;
mod gc;
mod status;
mod upload;

pub use abort::run_abort;
pub use gc::run_gc;
pub use status::run_status;
pub use upload::run_upload;
