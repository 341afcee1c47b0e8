//! Raster images as uniform RGBA grids

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::debug;

use crate::error::{Error, Result};

/// Name that resolves to the procedurally drawn logo instead of a file.
pub const BUILTIN_LOGO: &str = "windows-logo";

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Row-major RGBA pixels; `pixels.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        let valid = width > 0 && height > 0 && pixels.len() == width as usize * height as usize;
        valid.then_some(Self { width, height, pixels })
    }

    /// Builds a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba) -> Option<Self> {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Four coloured panes on a transparent background.
    pub fn windows_logo(size: u32) -> Self {
        let size = size.max(8);
        let border = (size as f32 * 0.05).round().max(1.0) as u32;
        let pane = (size - border * 3) / 2;
        let colors = [
            Rgba::opaque(246, 83, 20),
            Rgba::opaque(124, 187, 0),
            Rgba::opaque(0, 161, 241),
            Rgba::opaque(255, 187, 0),
        ];
        let slot = |v: u32| {
            if (border..border + pane).contains(&v) {
                Some(0)
            } else if (border * 2 + pane..border * 2 + pane * 2).contains(&v) {
                Some(1)
            } else {
                None
            }
        };
        let pixels = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .map(|(x, y)| match (slot(x), slot(y)) {
                (Some(col), Some(row)) => colors[row * 2 + col],
                _ => Rgba::TRANSPARENT,
            })
            .collect();
        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

fn supported(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Gif
    )
}

/// Decodes the file at `path`, taking the first frame of animations and
/// widening every colour type to 8-bit RGBA (opaque when the source has no
/// alpha channel). The container is chosen from the file signature, never
/// from the extension.
pub fn decode(path: &Path) -> Result<PixelGrid> {
    let bytes = fs::read(path).map_err(|e| {
        debug!(path = %path.display(), "read failed: {}", e);
        Error::NotFound {
            path: path.to_path_buf(),
        }
    })?;

    let format = image::guess_format(&bytes)
        .ok()
        .filter(|format| supported(*format))
        .ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| Rgba::new(p.0[0], p.0[1], p.0[2], p.0[3]))
        .collect();

    debug!(path = %path.display(), ?format, width, height, "decoded image");
    PixelGrid::new(width, height, pixels).ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
        reason: "image has no pixels".to_string(),
    })
}

/// Finds an image by path, by name in `images_dir`, or by name plus one of
/// the known extensions.
pub fn resolve_image(name: &str, images_dir: &Path) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Some(direct);
    }
    let in_dir = images_dir.join(name);
    if in_dir.is_file() {
        return Some(in_dir);
    }
    EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{}.{}", name, ext)))
        .find(|candidate| candidate.is_file())
}

/// Image file names in `images_dir`, sorted.
pub fn list_images(images_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(images_dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| {
                    let lower = name.to_lowercase();
                    EXTENSIONS.iter().any(|ext| lower.ends_with(&format!(".{}", ext)))
                })
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// `<data dir>/winfetch/images`.
pub fn default_images_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("winfetch")
        .join("images")
}
