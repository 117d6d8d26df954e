mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_line;
pub use types::AppState;
