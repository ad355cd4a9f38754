//! Error surface of the conversion pipeline.
//!
//! Almost every fault degrades in place (markers left literal, passes
//! skipped) per the processor's "never fail on user input" policy, so the
//! variants here are the few conditions that genuinely abort a conversion.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApexError {
    /// A strict-mode external filter exited non-zero or produced output
    /// the pipeline could not use.
    #[error("external filter `{command}` failed: {reason}")]
    FilterFailed { command: String, reason: String },

    /// Spawning an external filter process failed in strict mode.
    #[error("could not run external filter `{command}`: {source}")]
    FilterSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A required file (stylesheet asked to be embedded with strict
    /// semantics, bibliography in strict contexts) could not be read.
    #[error("could not read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
