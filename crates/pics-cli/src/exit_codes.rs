//! Process exit codes of the `pics` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const NO_MATCHES: i32 = 1; // --fail-on-empty and nothing applicable
pub const CONFIG_ERROR: i32 = 2; // bad request, missing store, unreadable input
