use serde::Deserialize;

/// Feature flags for the attribution engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Classify commits without a provenance record by author name
    pub heuristic_fallback: bool,
    /// Read uncached notes for all commits of a blame in one batch
    pub batch_prefetch: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            heuristic_fallback: true,
            batch_prefetch: true,
        }
    }
}

/// Deserializable version of FeatureFlags with all optional fields
/// and unknown fields allowed for graceful degradation
#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct FileFeatureFlags {
    #[serde(default, rename = "resolve.heuristic_fallback")]
    heuristic_fallback: Option<bool>,
    #[serde(default, rename = "resolve.batch_prefetch")]
    batch_prefetch: Option<bool>,
}

impl FeatureFlags {
    /// Build FeatureFlags from file configuration
    /// Falls back to defaults for any invalid or missing values
    pub(crate) fn from_file_config(file_flags: Option<FileFeatureFlags>) -> Self {
        let file_flags = match file_flags {
            Some(flags) => flags,
            None => return FeatureFlags::default(),
        };

        let defaults = FeatureFlags::default();

        FeatureFlags {
            heuristic_fallback: file_flags
                .heuristic_fallback
                .unwrap_or(defaults.heuristic_fallback),
            batch_prefetch: file_flags
                .batch_prefetch
                .unwrap_or(defaults.batch_prefetch),
        }
    }
}
