//! Captured front and back views.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::compositor::data_uri;
use crate::design::Side;
use crate::error::Result;

/// A PNG-encoded render of one fixed viewpoint. Holds no scene state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedArtifact {
    pub side: Side,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl CapturedArtifact {
    pub fn encode(side: Side, image: &RgbaImage) -> Result<Self> {
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(image.clone()).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            side,
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}_view.png", self.side)
    }

    pub fn data_uri(&self) -> String {
        data_uri("image/png", &self.png)
    }

    /// Writes the artifact into `dir` under its download name.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.png)?;
        log::info!("saved {}", path.display());
        Ok(path)
    }
}

/// The two captures of one "capture both views" action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedViews {
    pub front: CapturedArtifact,
    pub back: CapturedArtifact,
}

impl CapturedViews {
    /// Front first, then back.
    pub fn in_order(&self) -> [&CapturedArtifact; 2] {
        [&self.front, &self.back]
    }

    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<[PathBuf; 2]> {
        let dir = dir.as_ref();
        Ok([self.front.save_in(dir)?, self.back.save_in(dir)?])
    }
}

/// Bytes per row of a readback buffer, padded to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strips the row padding of a mapped readback buffer and converts BGRA to
/// RGBA when the source format requires it.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32, bgra: bool) -> Vec<u8> {
    let row = (width * 4) as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded_row as usize).take(height as usize) {
        pixels.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    if bgra {
        for px in pixels.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    pixels
}
