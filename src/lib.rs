pub mod models;
pub mod services;

pub use services::command::Command;
pub use services::contest_engine::{ContestEngine, EngineError, ErrorKind};
