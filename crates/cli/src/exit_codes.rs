//! CLI Exit Code Registry
//!
//! Single source of truth for all exit codes. Exit codes are part of the
//! shell contract — batch scripts gate document acceptance on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Document validated clean (warnings allowed)    |
//! | 1    | Error-severity issues found                    |
//! | 2    | CLI usage error (bad args, unreadable input)   |
//! | 3    | Invalid config file                            |
//! | 4    | Runtime error (IO, malformed JSON)             |

/// Success — no error-severity issues.
pub const EXIT_SUCCESS: u8 = 0;

/// Validation found error-severity issues. Like `diff(1)`, exit 1 means
/// "the document does not reconcile."
pub const EXIT_FINDINGS: u8 = 1;

/// Usage error — bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime error — unreadable input, malformed extraction JSON, write
/// failure.
pub const EXIT_RUNTIME: u8 = 4;
