//! Dependency-ordered build orchestration over an external coding agent.
//!
//! A plan (`.ai/plan.json`) describes an application as a graph of components.
//! The scheduler builds ready components one at a time, each through a
//! bounded verification loop in which the agent reports `OK` or
//! `ERROR: <build output>`, and persists the plan after every transition so a
//! run can resume after a crash.
//!
//! - **[`core`]**: Pure, deterministic logic (selection, reply classification,
//!   plan invariants). No I/O.
//! - **[`io`]**: Filesystem, configuration, child processes and agent backends.
//!
//! Orchestration modules ([`build`], [`verify`], [`next`], [`validate`],
//! [`create_plan`]) coordinate the two to implement CLI commands.

pub mod build;
pub mod core;
pub mod create_plan;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod next;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
pub mod verify;
