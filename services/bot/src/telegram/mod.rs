pub mod commands;
pub mod dispatch;
pub mod envelope;
pub mod format;
pub mod quiz_session;
pub mod replies;
pub mod state;

pub use commands::Command;
pub use dispatch::schema;
pub use state::AppState;
