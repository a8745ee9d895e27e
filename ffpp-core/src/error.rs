//! Error types for environment and mempool operations
//!
//! Every failure reported by the native layer is translated at the boundary
//! into a [`NativeError`] carrying the raw code and the description looked up
//! at the moment of failure. [`Error`] then classifies it by the operation
//! that failed.

use std::os::raw::c_int;

use crate::ffi;

/// Result type alias for environment and mempool operations
pub type Result<T> = std::result::Result<T, Error>;

/// A failure code reported by the native environment, with its description.
///
/// The description is rendered when the error is built, never cached per
/// code: the subsystem's string table may format unknown codes into a shared
/// buffer that the next call overwrites.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{description} (rte_errno {code})")]
pub struct NativeError {
    code: c_int,
    description: String,
}

impl NativeError {
    /// Read the most recent failure code from the ambient error slot.
    ///
    /// Only meaningful immediately after a failing native call and on the
    /// thread that made it. The operations in this crate already return the
    /// translated error inline, so callers rarely need this.
    pub fn current() -> Self {
        Self::from_code(ffi::errno())
    }

    /// Describe an explicit error code.
    pub fn from_code(code: c_int) -> Self {
        Self {
            code,
            description: ffi::strerror(code),
        }
    }

    /// The raw numeric code (an `errno` value or an `E_RTE_*` code).
    pub fn code(&self) -> c_int {
        self.code
    }

    /// Human-readable description from the subsystem string table.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the code is owned by the environment rather than libc.
    pub fn is_environment_code(&self) -> bool {
        self.code >= ffi::RTE_MIN_ERRNO
    }
}

/// Contract violations that the type system cannot rule out on its own.
///
/// Using a pool before init, after free, or cleaning up twice are not listed:
/// ownership makes those programs fail to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A second environment was requested while one is live.
    #[error("the environment is already initialized in this process")]
    AlreadyInitialized,
}

/// Errors surfaced by [`crate::Environment`] and [`crate::Mempool`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Environment bring-up failed: bad arguments, not enough huge-page
    /// memory, unavailable cores, or a device that could not be attached.
    ///
    /// No pool operation is possible afterwards; exiting is the only safe
    /// recovery once the native initializer has run.
    #[error("environment initialization failed: {0}")]
    EnvironmentInit(#[source] NativeError),

    /// Pool creation failed: name collision, invalid sizes, cache too large,
    /// or not enough memory on the requested socket. Recoverable.
    #[error("failed to create mempool `{name}`: {source}")]
    PoolCreation {
        name: String,
        #[source]
        source: NativeError,
    },

    /// Programmer error.
    #[error("precondition violated: {0}")]
    Precondition(#[from] Violation),
}

impl Error {
    /// The native error behind this failure, if any.
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            Self::EnvironmentInit(native) => Some(native),
            Self::PoolCreation { source, .. } => Some(source),
            Self::Precondition(_) => None,
        }
    }

    /// Shortcut for `native().map(NativeError::code)`.
    pub fn code(&self) -> Option<c_int> {
        self.native().map(NativeError::code)
    }

    /// Whether retrying with different parameters can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PoolCreation { .. })
    }

    pub(crate) fn pool(name: &str, source: NativeError) -> Self {
        Self::PoolCreation {
            name: name.to_string(),
            source,
        }
    }
}
