use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PROFILE_ENV;

/// Separator between a profile name and its generation tag.
pub const GENERATION_SEPARATOR: char = '@';

/// Generation selected when a profile names none.
pub const LATEST_GENERATION: &str = "latest";

/// Named, generation-tagged configuration selecting one directory subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Profile {
    name: String,
    generation: String,
}

impl Profile {
    /// Builds a profile from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, generation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: generation.into(),
        }
    }

    /// Builds the `latest` generation of `name`.
    #[must_use]
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, LATEST_GENERATION)
    }

    /// Profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Generation tag.
    #[must_use]
    pub fn generation(&self) -> &str {
        self.generation.as_str()
    }

    /// Returns `true` for the `latest` generation.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.generation == LATEST_GENERATION
    }

    /// Directory name of the profile under the profiles directory.
    #[must_use]
    pub fn dir_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}{GENERATION_SEPARATOR}{}",
            self.name, self.generation
        )
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let selector = input.trim();
        let (name, generation) = match selector.split_once(GENERATION_SEPARATOR) {
            Some((name, generation)) => (name, generation),
            None => (selector, LATEST_GENERATION),
        };
        if name.is_empty() {
            return Err(ProfileError::Malformed {
                selector: input.to_owned(),
                reason: "the profile name is empty",
            });
        }
        if generation.is_empty() {
            return Err(ProfileError::Malformed {
                selector: input.to_owned(),
                reason: "the generation after '@' is empty",
            });
        }
        if name.contains(['/', '\\']) || generation.contains(['/', '\\']) {
            return Err(ProfileError::Malformed {
                selector: input.to_owned(),
                reason: "profile names may not contain path separators",
            });
        }
        Ok(Self::new(name, generation))
    }
}

/// Errors raised while selecting a profile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// The profile selector could not be parsed.
    #[error(
        "invalid profile '{selector}': {reason}\n\
         Set {env} to 'name' or 'name@generation', or unset it to use the \
         legacy layout:\n  {env}= tailor ...",
        env = PROFILE_ENV
    )]
    Malformed {
        /// Raw selector value.
        selector: String,
        /// Why parsing failed.
        reason: &'static str,
    },
    /// No candidate profile directory exists.
    #[error(
        "profile '{profile}' was not found in '{profiles_dir}' (tried: {})\n\
         Create the profile directory, point TAILOR_PROFILES_DIR at the directory \
         holding it, or unset {env}:\n  {env}= tailor ...",
        .tried.join(", "),
        env = PROFILE_ENV
    )]
    NotFound {
        /// Profile requested by the user.
        profile: String,
        /// Directory that was searched.
        profiles_dir: String,
        /// Candidate directories probed, in order.
        tried: Vec<String>,
    },
}
