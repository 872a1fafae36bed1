//! Exit codes of the `inciscope` binary.
//!
//! 0-3 are shared by every subcommand. 60-62 report why the engine refused
//! a request, so scripts can tell a broken context file from a bad
//! `--known` value without parsing stderr.

use inciscope_estimate::EstimateError;

pub const EXIT_SUCCESS: u8 = 0;

/// Engine failure with no dedicated code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments, malformed `--known`, or no context found.
pub const EXIT_USAGE: u8 = 2;

/// A declaration, context or output file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Context file failed to parse or validate.
pub const EXIT_ESTIMATE_INVALID_CONTEXT: u8 = 60;

/// Known percentages rejected: invalid value, sum over 100, no matching
/// ingredient, declared-order violation, or an unbalanced fully-known list.
pub const EXIT_ESTIMATE_INVALID_KNOWN: u8 = 61;

/// Requested profile category is not in the context.
pub const EXIT_ESTIMATE_UNKNOWN_PROFILE: u8 = 62;

/// Map an engine error to its exit code.
pub fn estimate_exit_code(err: &EstimateError) -> u8 {
    match err {
        EstimateError::ConfigParse(_) | EstimateError::ConfigValidation(_) => {
            EXIT_ESTIMATE_INVALID_CONTEXT
        }
        EstimateError::UnknownProfile(_) => EXIT_ESTIMATE_UNKNOWN_PROFILE,
        e if e.is_anchor_error() => EXIT_ESTIMATE_INVALID_KNOWN,
        _ => EXIT_ERROR,
    }
}
