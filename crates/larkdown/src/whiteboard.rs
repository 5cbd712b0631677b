//! Whiteboard snapshots encoded as PNG

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use larkdown_core::{FetchError, Media, MediaSource};
use tokio_util::sync::CancellationToken;

use crate::block::{Bitmap, BitmapSource};

/// File name suggested for whiteboard snapshots
pub const WHITEBOARD_FILE_NAME: &str = "whiteboard.png";

/// Media source that rasterizes a whiteboard and encodes it as PNG
pub struct WhiteboardSnapshot {
    source: Arc<dyn BitmapSource>,
}

impl WhiteboardSnapshot {
    pub fn new(source: Arc<dyn BitmapSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl MediaSource for WhiteboardSnapshot {
    async fn fetch(&self, cancel: CancellationToken) -> Result<Media, FetchError> {
        let bitmap = self
            .source
            .bitmap(cancel)
            .await?
            .ok_or_else(|| FetchError::Unavailable("whiteboard has no content".to_string()))?;

        let bytes = encode_png(bitmap)?;
        Ok(Media::new(bytes))
    }
}

/// Encode an RGBA bitmap as PNG
pub fn encode_png(bitmap: Bitmap) -> Result<Vec<u8>, FetchError> {
    let (width, height) = (bitmap.width, bitmap.height);
    let image = RgbaImage::from_raw(width, height, bitmap.rgba).ok_or_else(|| {
        FetchError::Failed(format!("pixel buffer does not match {width}x{height}"))
    })?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| FetchError::Failed(e.to_string()))?;
    Ok(bytes)
}
