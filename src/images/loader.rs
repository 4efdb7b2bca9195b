use std::path::PathBuf;

use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, warn};

use super::palette::{extract_palette, ImagePalette};
use crate::models::StoryItem;

/// A decoded story image plus its derived tint colors. `image` is `None` when
/// loading failed and the placeholder palette is in effect; the timer engine
/// never hears about the failure.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub item_id: String,
    pub image: Option<DynamicImage>,
    pub palette: ImagePalette,
    pub placeholder: bool,
}

pub struct ImageLoader;

impl ImageLoader {
    pub async fn load(item: &StoryItem) -> LoadedImage {
        match decode(item.image_path.clone()).await {
            Ok(image) => {
                let palette = extract_palette(&image);
                debug!(
                    "loaded {} ({}x{}), background {}",
                    item.image_path.display(),
                    image.width(),
                    image.height(),
                    palette.background.to_hex()
                );
                LoadedImage {
                    item_id: item.id.clone(),
                    image: Some(image),
                    palette,
                    placeholder: false,
                }
            }
            Err(err) => {
                warn!(
                    "showing placeholder for {}: {err:#}",
                    item.image_path.display()
                );
                LoadedImage {
                    item_id: item.id.clone(),
                    image: None,
                    palette: ImagePalette::default(),
                    placeholder: true,
                }
            }
        }
    }
}

async fn decode(path: PathBuf) -> Result<DynamicImage> {
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode {}", path.display()))
    })
    .await
    .context("image decode worker join failed")?
}
