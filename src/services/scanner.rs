use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collect image files under `dir`, sorted by path.
///
/// Unreadable entries are skipped.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::InvalidPath {
            path: format!("{} is not a directory", dir.display()),
        });
    }

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_image_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_images_recursively() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("ward-7");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("b.JPG"), b"x").unwrap();
        fs::write(nested.join("a.png"), b"x").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let images = discover_images(temp_dir.path()).unwrap();
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|p| is_image_path(p)));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.png");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(discover_images(&file), Err(ScanError::InvalidPath { .. })));
    }
}
