//! Stable exit codes for internloop CLI commands.

/// Command succeeded or a ready component was found.
pub const OK: i32 = 0;
/// Invalid plan/config, gateway failure, or any other error.
pub const INVALID: i32 = 1;
/// `internloop next` found every component completed.
pub const COMPLETE: i32 = 2;
/// `internloop next` found unfinished components that cannot start.
pub const STALLED: i32 = 3;
