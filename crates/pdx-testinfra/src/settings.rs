//! Container settings, overridable through `TEST_DATASOURCE_*` variables.

use std::fmt;

pub const IMAGE_ENV: &str = "TEST_DATASOURCE_IMAGE";
pub const DB_ENV: &str = "TEST_DATASOURCE_DB";
pub const USER_ENV: &str = "TEST_DATASOURCE_USER";
pub const PASSWORD_ENV: &str = "TEST_DATASOURCE_PASSWORD";

pub const DEFAULT_IMAGE: &str = "postgres:16-alpine";
pub const DEFAULT_DB: &str = "pokedex_test";
pub const DEFAULT_USER: &str = "test";
pub const DEFAULT_PASSWORD: &str = "test";

/// Image reference split into repository name and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// `postgres:16-alpine` → (`postgres`, `16-alpine`). A missing tag means
    /// `latest`; a registry port (`host:5000/postgres`) is not a tag.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        match reference.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !name.is_empty() && !tag.is_empty() => {
                Self {
                    name: name.to_string(),
                    tag: tag.to_string(),
                }
            }
            _ => Self {
                name: reference.to_string(),
                tag: "latest".to_string(),
            },
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ContainerSettings {
    pub image: ImageRef,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ContainerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerSettings")
            .field("image", &self.image.to_string())
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ContainerSettings {
    /// Settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup; unset or empty values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            image: ImageRef::parse(&get(IMAGE_ENV, DEFAULT_IMAGE)),
            database: get(DB_ENV, DEFAULT_DB),
            username: get(USER_ENV, DEFAULT_USER),
            password: get(PASSWORD_ENV, DEFAULT_PASSWORD),
        }
    }
}
