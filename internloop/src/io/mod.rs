//! I/O helpers: plan persistence, configuration, agent backends, and logs.

pub mod agent;
pub mod attempt_log;
pub mod config;
pub mod copilot;
pub mod cursor;
pub mod paths;
pub mod plan_store;
pub mod process;
pub mod prompt;
