//! Safety checks to prevent accidental data loss.
//!
//! Archival is copy-then-delete. If the archive key ever resolved to the
//! source key, the delete would destroy the only copy of the input, so these
//! checks run before any object is touched.

use anyhow::{bail, Result};

use crate::config::LayoutConfig;

/// Validates that the configured prefixes can't clobber pending input.
///
/// Checks:
/// - All prefixes are non-empty and end with `/`
/// - The processed prefix is not the input prefix or nested inside it
/// - The output prefix is not nested inside the input prefix
pub fn validate_layout(layout: &LayoutConfig) -> Result<()> {
    let prefixes = [
        ("input_prefix", &layout.input_prefix),
        ("processed_prefix", &layout.processed_prefix),
        ("output_prefix", &layout.output_prefix),
    ];
    for (name, prefix) in prefixes {
        if prefix.is_empty() || !prefix.ends_with('/') {
            bail!(
                "Safety check failed: {} '{}' must be a non-empty prefix ending in '/'",
                name,
                prefix
            );
        }
    }

    if layout.processed_prefix.starts_with(&layout.input_prefix) {
        bail!(
            "Safety check failed: processed prefix '{}' cannot be inside input prefix '{}'",
            layout.processed_prefix,
            layout.input_prefix
        );
    }

    if layout.output_prefix.starts_with(&layout.input_prefix) {
        bail!(
            "Safety check failed: output prefix '{}' cannot be inside input prefix '{}'",
            layout.output_prefix,
            layout.input_prefix
        );
    }

    Ok(())
}

/// Validates a single archive move before the source is deleted.
pub fn validate_archive_key(source_key: &str, archive_key: &str) -> Result<()> {
    if source_key == archive_key {
        bail!(
            "Safety check failed: archive key '{}' cannot be the same as source",
            archive_key
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(input: &str, processed: &str, output: &str) -> LayoutConfig {
        LayoutConfig {
            input_prefix: input.to_string(),
            processed_prefix: processed.to_string(),
            output_prefix: output.to_string(),
        }
    }

    #[test]
    fn test_default_layout_is_valid() {
        assert!(validate_layout(&LayoutConfig::default()).is_ok());
    }

    #[test]
    fn test_same_input_and_processed_rejected() {
        let result = validate_layout(&layout("raw/", "raw/", "out/"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be inside input prefix"));
    }

    #[test]
    fn test_nested_processed_rejected() {
        assert!(validate_layout(&layout("raw/", "raw/done/", "out/")).is_err());
    }

    #[test]
    fn test_output_inside_input_rejected() {
        assert!(validate_layout(&layout("raw/", "done/", "raw/out/")).is_err());
    }

    #[test]
    fn test_missing_trailing_slash_rejected() {
        let result = validate_layout(&layout("raw_data/to_processed", "done/", "out/"));
        assert!(result.unwrap_err().to_string().contains("ending in '/'"));
    }

    #[test]
    fn test_archive_key_equal_to_source() {
        assert!(validate_archive_key("raw/a.json", "raw/a.json").is_err());
        assert!(validate_archive_key("raw/a.json", "done/a.json").is_ok());
    }
}
