//! Process exit codes. Part of the public contract for scripts and CI.

pub const SUCCESS: i32 = 0;
/// The run completed but some items failed, and `--fail-on-errors` was set.
pub const ITEM_ERRORS: i32 = 1;
/// Bad configuration, unreadable input, or any other fatal error.
pub const CONFIG_ERROR: i32 = 2;
