//! Client configuration.

use crate::crypto::EncryptionKey;

/// Default minimum length of an entity name.
pub const DEFAULT_NAME_MIN_LENGTH: usize = 2;
/// Default maximum length of an entity name.
pub const DEFAULT_NAME_MAX_LENGTH: usize = 16;
/// Default maximum length of an entity description.
pub const DEFAULT_DESCRIPTION_MAX_LENGTH: usize = 50;

/// Configuration shared by the codec registry and the built-in validations.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key enabling the binary image transform. `None` stores payloads as-is.
    pub image_key: Option<EncryptionKey>,

    /// Minimum name length, in characters.
    pub name_min_length: Option<usize>,

    /// Maximum name length, in characters.
    pub name_max_length: Option<usize>,

    /// Maximum description length, in characters.
    pub description_max_length: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_key: None,
            name_min_length: Some(DEFAULT_NAME_MIN_LENGTH),
            name_max_length: Some(DEFAULT_NAME_MAX_LENGTH),
            description_max_length: Some(DEFAULT_DESCRIPTION_MAX_LENGTH),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the image transform with the given key.
    #[must_use]
    pub fn with_image_key(mut self, key: EncryptionKey) -> Self {
        self.image_key = Some(key);
        self
    }

    /// Sets the name length bounds. `None` leaves a side unbounded.
    #[must_use]
    pub const fn name_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.name_min_length = min;
        self.name_max_length = max;
        self
    }

    /// Sets the maximum description length. `None` disables the check.
    #[must_use]
    pub const fn description_max_length(mut self, max: Option<usize>) -> Self {
        self.description_max_length = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.image_key.is_none());
        assert_eq!(config.name_min_length, Some(2));
        assert_eq!(config.name_max_length, Some(16));
        assert_eq!(config.description_max_length, Some(50));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .with_image_key(EncryptionKey::generate())
            .name_length(Some(1), None)
            .description_max_length(Some(10));

        assert!(config.image_key.is_some());
        assert_eq!(config.name_min_length, Some(1));
        assert_eq!(config.name_max_length, None);
        assert_eq!(config.description_max_length, Some(10));
    }
}
