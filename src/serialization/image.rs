use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{constants::RECIPE_IMAGE_DIRECTORY, error::HtmlError};

const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// An image submitted inline as `data:image/<subtype>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Base64Image {
    pub extension: String,
    pub content: Vec<u8>,
}

impl Base64Image {
    pub fn from_data_uri(value: &str) -> Result<Self, &'static str> {
        let value = value.trim();
        let (header, payload) = value
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or(INVALID_IMAGE)?;

        let subtype = header
            .strip_prefix("image/")
            .ok_or("Only image uploads are accepted.")?;
        let extension = subtype
            .split('+')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(INVALID_IMAGE);
        }

        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let content = STANDARD.decode(payload).map_err(|_| INVALID_IMAGE)?;
        if content.is_empty() {
            return Err("The submitted file is empty.");
        }

        Ok(Self { extension, content })
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", uuid::Uuid::new_v4(), self.extension)
    }
}

/// Recipe images on local disk under the media root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save(&self, image: &Base64Image) -> Result<String, potion::Error> {
        let directory = self.root.join(RECIPE_IMAGE_DIRECTORY);
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            log::error!("Failed to create {}: {e}", directory.display());
            HtmlError::InternalServerError.default()
        })?;

        let file_name = image.file_name();
        let path = directory.join(&file_name);
        tokio::fs::write(&path, &image.content).await.map_err(|e| {
            log::error!("Failed to write {}: {e}", path.display());
            HtmlError::InternalServerError.default()
        })?;

        log::debug!("> Stored image {}", path.display());
        Ok(format!("{RECIPE_IMAGE_DIRECTORY}/{file_name}"))
    }

    /// Best effort; a file that is already gone is not an error.
    pub async fn remove(&self, relative_path: &str) {
        let path = self.root.join(relative_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }
}
