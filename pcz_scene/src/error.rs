//! Error types for the PCZ scene manager
//!
//! This module defines the error types used throughout the crate.
//! Only scene-construction and configuration operations return errors;
//! the per-frame update and visibility paths absorb bad references instead.

use std::fmt;

/// Result type for PCZ scene operations
pub type Result<T> = std::result::Result<T, Error>;

/// PCZ scene errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed scene description or invalid operation on the scene
    SceneError(String),

    /// An item (zone, portal, node, camera, light, factory) with this name already exists
    DuplicateItem(String),

    /// A named item could not be found
    ItemNotFound(String),

    /// Invalid or missing configuration value
    InvalidConfig(String),

    /// Initialization failed (engine, scene manager, page source)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SceneError(msg) => write!(f, "Scene error: {}", msg),
            Error::DuplicateItem(msg) => write!(f, "Duplicate item: {}", msg),
            Error::ItemNotFound(msg) => write!(f, "Item not found: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build the matching [`Error`] value
///
/// The variant defaults to `SceneError`. Prefix the format string with
/// `Variant:` to pick another one.
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("pcz::SceneManager", ItemNotFound: "Zone '{}' not found", name);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident: $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::pcz::Error::$variant(message)
    }};
    ($source:expr, $($arg:tt)*) => {
        $crate::engine_err!($source, SceneError: $($arg)*)
    };
}

/// Log an error and return it from the current function
///
/// # Example
///
/// ```ignore
/// engine_bail!("pcz::SceneManager", DuplicateItem: "Zone '{}' already exists", name);
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($($arg:tt)*) => {
        return Err($crate::engine_err!($($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
