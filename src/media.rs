use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{constants::IMAGE_EXTENSIONS, error::FoodgramError};

/// Decodes a base64 image, optionally wrapped in a
/// `data:image/<ext>;base64,` URI, into its extension and bytes.
pub fn decode_image(data: &str) -> Result<(String, Vec<u8>), FoodgramError> {
    let (extension, payload) = match data.strip_prefix("data:") {
        Some(uri) => {
            let (header, payload) = uri
                .split_once(',')
                .ok_or_else(|| FoodgramError::validation("image", "Malformed data URI"))?;
            let extension = header
                .strip_prefix("image/")
                .and_then(|rest| rest.strip_suffix(";base64"))
                .ok_or_else(|| FoodgramError::validation("image", "Expected a base64 image"))?;
            (extension.to_lowercase(), payload)
        }
        None => (String::from("png"), data),
    };

    let extension = match extension.as_str() {
        "jpeg" => String::from("jpg"),
        _ => extension,
    };

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(FoodgramError::validation(
            "image",
            format!("Unsupported image type '{extension}'"),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| FoodgramError::validation("image", "Invalid base64 data"))?;

    if bytes.is_empty() {
        return Err(FoodgramError::validation("image", "Image must not be empty"));
    }

    Ok((extension, bytes))
}

/// Writes the image below `media_root/recipes` and returns the stored path,
/// relative to `media_root`.
pub async fn save_image(data: &str, media_root: &Path) -> Result<String, FoodgramError> {
    let (extension, bytes) = decode_image(data)?;

    let relative = format!("recipes/{}.{extension}", uuid::Uuid::new_v4());
    let path = media_root.join(&relative);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    log::trace!("> Stored image {}", path.display());

    Ok(relative)
}

pub async fn remove_image(relative: &str, media_root: &Path) {
    if relative.is_empty() || relative.contains("..") {
        return;
    }

    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        log::warn!("> Failed to remove image {relative}: {e}");
    }
}
