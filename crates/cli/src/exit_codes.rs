//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unreadable file, read-only sheet...)  |
//! | 2    | Usage error (bad args, malformed script line)        |
//! | 3    | Validation failure (bad name, number or expression)  |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - I/O, malformed sheet file, sync or read-only refusal.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or a script line that does not parse.
pub const EXIT_USAGE: u8 = 2;

/// Input rejected by the sheet: invalid variable name, non-numeric
/// paste, bad number or expression in an editor.
pub const EXIT_VALIDATION: u8 = 3;
