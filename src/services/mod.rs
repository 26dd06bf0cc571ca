pub mod command;
pub mod config_loader;
pub mod contest_engine;
pub mod engine_actor;
pub mod freeze;
pub mod metrics;
pub mod protocol;
pub mod rank_index;
pub mod replay;
pub mod scoreboard;
pub mod scroll_log;
pub mod submission_ledger;
pub mod team_registry;
