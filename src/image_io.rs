use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::errors::{RockAnalysisError, Result};

/// Extensions accepted when scanning a directory
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// A decoded micrograph with its source metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all supported image files from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(RockAnalysisError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(RockAnalysisError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    find_image_files_recursive(dir_path, &mut image_files)?;
    image_files.sort();

    Ok(image_files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && has_image_extension(&path) {
            result.push(path);
        }
    }

    Ok(())
}

/// Load an image file as 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RockAnalysisError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => RockAnalysisError::Io(io),
        other => RockAnalysisError::UnsupportedImage(format!("{}: {}", path.display(), other)),
    })?;

    debug!(path = %path.display(), width = img.width(), height = img.height(), "image loaded");

    Ok(InputImage {
        image: img.to_rgb8(),
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGB image as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn scans_supported_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();

        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        save_image(&img, dir.path().join("b.png")).unwrap();
        save_image(&img, nested.join("a.PNG")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let files = get_image_files_in_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| has_image_extension(p)));
    }

    #[test]
    fn loads_what_was_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        let img = RgbImage::from_pixel(3, 2, Rgb([200, 100, 50]));
        save_image(&img, &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.filename, "sample");
        assert_eq!(loaded.image, img);
    }

    #[test]
    fn garbage_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_image(&path), Err(RockAnalysisError::UnsupportedImage(_))));
    }

    #[test]
    fn missing_directory_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            get_image_files_in_dir(dir.path().join("nope")),
            Err(RockAnalysisError::InvalidPath(_))
        ));
    }
}
