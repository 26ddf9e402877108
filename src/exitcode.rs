//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error: corrupted forest, integrity violation
pub const DATAERR: i32 = 65;

/// Referenced node does not exist
pub const NOINPUT: i32 = 66;

/// Store unreachable or closed
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Node cannot be created or removed in the current state
pub const CANTCREAT: i32 = 73;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
