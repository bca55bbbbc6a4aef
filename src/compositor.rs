//! Dynamic design textures.
//!
//! Text is painted on the CPU into a square white canvas using cosmic-text
//! (through glyphon's re-export) and uploaded like any other image. Uploaded
//! files are decoded with the `image` crate; decoding is synchronous and is
//! meant to run off the render thread.

use std::path::Path;

use base64::Engine;
use glyphon::cosmic_text::{
    Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight,
};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::design::{Rgb, Side, TextRequest};
use crate::error::{Result, StudioError};

/// Sampler address mode of a design texture along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

impl From<Wrap> for wgpu::AddressMode {
    fn from(wrap: Wrap) -> Self {
        match wrap {
            Wrap::Clamp => wgpu::AddressMode::ClampToEdge,
            Wrap::Repeat => wgpu::AddressMode::Repeat,
        }
    }
}

/// A CPU-side texture ready to be bound onto a material slot.
#[derive(Clone, Debug)]
pub struct DesignTexture {
    pub image: RgbaImage,
    pub wrap_u: Wrap,
    pub wrap_v: Wrap,
    /// Row 0 of `image` maps to the bottom of the UV space.
    pub flip_y: bool,
    pub label: String,
}

impl DesignTexture {
    pub fn text(image: RgbaImage, side: Side) -> Self {
        Self {
            image,
            wrap_u: Wrap::Clamp,
            wrap_v: Wrap::Repeat,
            flip_y: true,
            label: format!("{side} text"),
        }
    }

    pub fn picture(image: RgbaImage, side: Side) -> Self {
        Self {
            image,
            wrap_u: Wrap::Clamp,
            wrap_v: Wrap::Clamp,
            flip_y: true,
            label: format!("{side} image"),
        }
    }

    /// Scales the image down so neither side exceeds `max_dimension`, keeping
    /// the aspect ratio. Images that already fit are returned untouched.
    pub fn fit_within(mut self, max_dimension: u32) -> Self {
        self.image = fit_image(self.image, max_dimension, &self.label);
        self
    }
}

/// Scales `image` down so its longest side is at most `max_dimension`.
pub fn fit_image(image: RgbaImage, max_dimension: u32, label: &str) -> RgbaImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        return image;
    }
    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    let (new_width, new_height) = (fit(width), fit(height));
    log::info!("scaling {label} down from {width}x{height} to {new_width}x{new_height}");
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// Vertical position of the text's middle line for a canvas of the given height.
///
/// Smaller divisors move the text further down the canvas.
pub fn text_anchor(canvas_height: u32, divisor: f32) -> f32 {
    canvas_height as f32 / divisor
}

/// Paints text requests onto the square design canvas.
pub struct TextPainter {
    canvas_size: u32,
    font_size: f32,
    // Loading the system font database is slow, so it happens on first use.
    font_system: Option<FontSystem>,
    // Font files queued until the database exists.
    extra_fonts: Vec<Vec<u8>>,
    swash_cache: SwashCache,
}

impl TextPainter {
    pub fn new(canvas_size: u32, font_size: f32) -> Self {
        Self {
            canvas_size: canvas_size.max(1),
            font_size,
            font_system: None,
            extra_fonts: Vec::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Adds a TrueType or OpenType font next to the system fonts.
    pub fn load_font(&mut self, data: Vec<u8>) {
        match self.font_system.as_mut() {
            Some(font_system) => font_system.db_mut().load_font_data(data),
            None => self.extra_fonts.push(data),
        }
    }

    /// Reads and adds every font file in `paths`. Unreadable files are logged
    /// and skipped.
    pub fn load_font_files<P: AsRef<Path>>(&mut self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            match std::fs::read(path) {
                Ok(data) => self.load_font(data),
                Err(e) => log::warn!("skipping font {}: {e}", path.display()),
            }
        }
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Renders `request` into a new texture for its side.
    pub fn paint(&mut self, request: &TextRequest) -> Result<DesignTexture> {
        let Rgb([r, g, b]) = Rgb::parse(&request.colour)?;
        let size = self.canvas_size;
        let mut canvas = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));

        let extra_fonts = &mut self.extra_fonts;
        let font_system = self.font_system.get_or_insert_with(|| {
            let mut font_system = FontSystem::new();
            for data in extra_fonts.drain(..) {
                font_system.db_mut().load_font_data(data);
            }
            font_system
        });
        let mut buffer = Buffer::new(font_system, Metrics::new(self.font_size, self.font_size));
        buffer.set_size(font_system, None, None);
        let attrs = Attrs::new()
            .family(Family::Name(request.font.family()))
            .weight(Weight::BOLD);
        buffer.set_text(font_system, &request.text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(font_system, false);

        let mut line_count = 0usize;
        let mut widest = 0f32;
        for run in buffer.layout_runs() {
            line_count += 1;
            widest = widest.max(run.line_w);
        }
        if line_count == 0 {
            return Ok(DesignTexture::text(canvas, request.side));
        }

        // Centre horizontally; put the middle of the block on the anchor.
        let block_height = line_count as f32 * self.font_size;
        let origin_x = ((size as f32 - widest) / 2.0).round() as i32;
        let origin_y =
            (text_anchor(size, request.divisor) - block_height / 2.0).round() as i32;

        buffer.draw(
            font_system,
            &mut self.swash_cache,
            Color::rgb(r, g, b),
            |x, y, w, h, colour| {
                let alpha = colour.a() as f32 / 255.0;
                if alpha <= 0.0 {
                    return;
                }
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let px = origin_x + x + dx;
                        let py = origin_y + y + dy;
                        if px < 0 || py < 0 || px >= size as i32 || py >= size as i32 {
                            continue;
                        }
                        let dst = canvas.get_pixel_mut(px as u32, py as u32);
                        let src = [colour.r(), colour.g(), colour.b()];
                        for c in 0..3 {
                            dst.0[c] = (src[c] as f32 * alpha + dst.0[c] as f32 * (1.0 - alpha))
                                .round() as u8;
                        }
                    }
                }
            },
        );

        Ok(DesignTexture::text(canvas, request.side))
    }
}

/// A user-selected image file, read fully into memory.
#[derive(Clone, Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    /// MIME type sniffed from the content, as a browser would report it.
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }
}

/// Result of decoding an upload.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub image: RgbaImage,
    /// The original file as a `data:` URI.
    pub data_uri: String,
}

/// Decodes an uploaded file into RGBA pixels plus its data URI.
pub fn decode_upload(upload: &UploadedImage, side: Side) -> Result<DecodedImage> {
    let image = image::load_from_memory(&upload.bytes)
        .map_err(|source| StudioError::Decode { side, source })?
        .to_rgba8();
    log::debug!(
        "decoded {} ({}x{}) for the {side} side",
        upload.file_name,
        image.width(),
        image.height()
    );
    Ok(DecodedImage {
        image,
        data_uri: data_uri(upload.mime_type(), &upload.bytes),
    })
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Font, Placement};

    #[test]
    fn anchors_move_down_from_chest_to_stomach() {
        let chest = text_anchor(800, Placement::Chest.divisor());
        let middle = text_anchor(800, Placement::Middle.divisor());
        let stomach = text_anchor(800, Placement::Stomach.divisor());
        assert!((chest - 800.0 / 3.0).abs() < 1e-3);
        assert!(chest < middle && middle < stomach);
    }

    #[test]
    fn text_canvas_is_square_and_white_at_the_corners() {
        let mut painter = TextPainter::new(64, 12.0);
        let request = TextRequest::new("HI", Side::Front, Font::Arial, Placement::Middle);
        let texture = painter.paint(&request).unwrap();
        assert_eq!(texture.image.dimensions(), (64, 64));
        assert_eq!(texture.image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(texture.wrap_u, Wrap::Clamp);
        assert_eq!(texture.wrap_v, Wrap::Repeat);
    }

    #[test]
    fn bundled_font_draws_ink() {
        let mut painter = TextPainter::new(64, 24.0);
        painter.load_font(include_bytes!("../tests/fonts/Inter-Bold.ttf").to_vec());
        let request = TextRequest::new("HI", Side::Front, Font::Arial, Placement::Middle);
        let texture = painter.paint(&request).unwrap();
        assert!(texture.image.pixels().any(|p| p.0[0] < 128));
    }

    #[test]
    fn oversized_images_shrink_to_the_limit_keeping_their_shape() {
        let wide = DesignTexture::picture(RgbaImage::new(9000, 2), Side::Front).fit_within(8192);
        assert_eq!(wide.image.dimensions(), (8192, 2));

        let tall = DesignTexture::picture(RgbaImage::new(300, 1200), Side::Back).fit_within(600);
        assert_eq!(tall.image.dimensions(), (150, 600));

        let small = DesignTexture::picture(RgbaImage::new(40, 20), Side::Back).fit_within(600);
        assert_eq!(small.image.dimensions(), (40, 20));
    }

    #[test]
    fn undecodable_upload_is_a_decode_error() {
        let upload = UploadedImage::new("notes.txt", b"not an image".to_vec());
        let err = decode_upload(&upload, Side::Back).unwrap_err();
        assert!(matches!(err, StudioError::Decode { side: Side::Back, .. }));
    }

    #[test]
    fn data_uri_carries_the_sniffed_mime_type() {
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(RgbaImage::new(2, 2))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_upload(&UploadedImage::new("dot.png", png), Side::Front).unwrap();
        assert!(decoded.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(decoded.image.dimensions(), (2, 2));
    }
}
