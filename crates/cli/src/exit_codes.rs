//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `lmatch` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified)                                |
//! | 2    | Usage error (bad arguments; also clap's own parse errors)  |
//! | 3    | Configuration error (config file, mapping, headers)        |
//! | 4    | Input error (dataset cannot be read or parsed)             |
//! | 5    | Unmatched rows or field mismatches found, with `--strict`  |
//! | 6    | Export failure (report could not be written)               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed `--key`/`--compare` specs.
pub const EXIT_USAGE: u8 = 2;

/// Configuration error - unreadable or invalid config, empty mapping,
/// mapped header missing or ambiguous.
pub const EXIT_CONFIG: u8 = 3;

/// Input error - a dataset file cannot be opened, decoded or parsed.
pub const EXIT_INPUT: u8 = 4;

/// Reconciliation found unmatched rows or mismatches and `--strict` was given.
pub const EXIT_DIFFS: u8 = 5;

/// Report export failed (xlsx or JSON file could not be written).
pub const EXIT_EXPORT: u8 = 6;
