// Shared kernel: cross-module concerns with no domain logic of their own.

pub mod config; // Environment-driven tunables
pub mod errors; // Shared error taxonomy
pub mod events; // Structured event emission boundary
pub mod utils; // Logging setup and macros

// Re-exports for convenience
pub use config::CoreConfig;
pub use errors::{AppError, AppResult};
pub use events::{CoreEvent, EventSink, LogEventSink};
