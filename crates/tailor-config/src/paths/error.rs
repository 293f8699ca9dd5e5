use thiserror::Error;

use super::ProfileError;

/// Errors raised while deriving the directory set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathResolveError {
    /// A path depended on the home directory, which could not be determined.
    #[error(
        "cannot determine the home directory needed to resolve '{needed_for}'\n\
         Set {variable} or {config_var} explicitly:\n  {config_var}=/path/to/config tailor ..."
    )]
    MissingHome {
        /// Environment variable normally holding the home directory.
        variable: &'static str,
        /// Variable that would bypass the home lookup.
        config_var: &'static str,
        /// Path that required the home directory.
        needed_for: String,
    },
    /// Profile selection failed with no fallback.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
