use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::request::UploadedImage;

const MAX_EXTENSION_LEN: usize = 8;

/// Scratch files written for one request; every recorded path is removed on drop.
#[derive(Debug)]
pub struct ScratchUploads {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

fn sanitized_extension(file_name: Option<&str>) -> Option<String> {
    let name = file_name?;
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    if extension.is_empty()
        || extension.len() > MAX_EXTENSION_LEN
        || !extension.chars().all(|ch| ch.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension)
}

impl ScratchUploads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ScratchUploads {
            dir: dir.into(),
            paths: Vec::new(),
        }
    }

    pub async fn save(&mut self, image: &UploadedImage) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file_name = Uuid::new_v4().simple().to_string();
        if let Some(extension) = sanitized_extension(image.file_name.as_deref()) {
            file_name.push('.');
            file_name.push_str(&extension);
        }
        let path = self.dir.join(file_name);

        // Recorded first so a partial write is still cleaned up.
        self.paths.push(path.clone());
        tokio::fs::write(&path, &image.bytes).await?;
        debug!("Saved upload to {} ({} bytes)", path.display(), image.bytes.len());
        Ok(path)
    }

    pub async fn save_all(&mut self, images: &[UploadedImage]) -> io::Result<Vec<PathBuf>> {
        let mut saved = Vec::with_capacity(images.len());
        for image in images {
            saved.push(self.save(image).await?);
        }
        Ok(saved)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for ScratchUploads {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("Failed to remove temporary upload {}: {}", path.display(), err),
            }
        }
    }
}
