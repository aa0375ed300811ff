//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 3-9     | io        | Reading/writing data and analysis files  |
//! | 10-19   | step      | A step request was rejected              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant mapping function below

use stepgrid_engine::StepError;
use stepgrid_io::IoError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid settings file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// IO (3-9)
// =============================================================================

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Data or analysis file could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Analysis file was written by a newer version.
pub const EXIT_ANALYSIS_VERSION: u8 = 5;

// =============================================================================
// Step (10-19)
// =============================================================================

/// Required param missing or malformed.
pub const EXIT_STEP_INVALID_PARAMETER: u8 = 10;

/// Bulk filter condition not recognized.
pub const EXIT_STEP_INVALID_FILTER_CONDITION: u8 = 11;

/// No performer registered for the step type.
pub const EXIT_STEP_UNKNOWN_TYPE: u8 = 12;

/// Step version newer than the performer supports.
pub const EXIT_STEP_UNSUPPORTED_VERSION: u8 = 13;

/// Step references a sheet or column that doesn't exist.
pub const EXIT_STEP_UNKNOWN_TARGET: u8 = 14;

pub fn step_exit_code(err: &StepError) -> u8 {
    match err {
        StepError::InvalidParameter { .. } => EXIT_STEP_INVALID_PARAMETER,
        StepError::InvalidFilterCondition(_) => EXIT_STEP_INVALID_FILTER_CONDITION,
        StepError::UnknownStepType(_) => EXIT_STEP_UNKNOWN_TYPE,
        StepError::UnsupportedStepVersion { .. } => EXIT_STEP_UNSUPPORTED_VERSION,
        StepError::UnknownSheet(_) | StepError::UnknownColumn { .. } => EXIT_STEP_UNKNOWN_TARGET,
        StepError::Serialization(_) => EXIT_ERROR,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. } | IoError::Write { .. } => EXIT_IO,
        IoError::Csv(_) | IoError::NoHeader { .. } | IoError::Json(_) => EXIT_PARSE,
        IoError::Data(_) => EXIT_PARSE,
        IoError::UnsupportedVersion { .. } => EXIT_ANALYSIS_VERSION,
    }
}
