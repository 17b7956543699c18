// Asset file loading

use super::AssetError;
use std::path::Path;

/// Supported rig asset types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Skeleton,
    Animation,
}

impl AssetKind {
    /// Archive type tag for this asset kind
    pub fn tag(&self) -> [u8; 8] {
        match self {
            AssetKind::Skeleton => *b"AFSKEL\0\0",
            AssetKind::Animation => *b"AFANIM\0\0",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Skeleton => "skel",
            AssetKind::Animation => "anim",
        }
    }
}

/// Read a whole archive from disk.
///
/// A missing file maps to `AssetError::NotFound`; the tag is checked by the
/// caller when it opens the archive.
pub fn load_archive<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, AssetError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AssetError::NotFound(path.to_string_lossy().to_string()));
    }

    Ok(std::fs::read(path)?)
}
