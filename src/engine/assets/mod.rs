// Binary rig assets
//
// Skeletons and animations are stored as small tagged archives. Loading is
// all-or-nothing: a failed load never leaves a half-built asset behind.

mod archive;
mod loader;

pub use archive::{ArchiveHeader, ArchiveReader, ArchiveWriter, ARCHIVE_VERSION};
pub use loader::{load_archive, AssetKind};

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset tag in {path}: expected {expected}, got {found}")]
    InvalidTag {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u32),

    #[error("Archive truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Malformed asset: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::NotFound("rigs/brawler.skel".to_string());
        assert_eq!(err.to_string(), "Asset not found: rigs/brawler.skel");
    }

    #[test]
    fn test_truncated_error_display() {
        let err = AssetError::Truncated {
            offset: 16,
            needed: 4,
        };
        assert_eq!(
            err.to_string(),
            "Archive truncated: needed 4 bytes at offset 16"
        );
    }
}
