use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma, RgbaImage};
use qrcode::{EcLevel, QrCode};
use tracing::{debug, info};

use crate::errors::{DsiError, DsiResult};
use crate::storage::traits::DocumentStore;

/// Smallest edge of the generated image, in pixels.
const MIN_SIZE: u32 = 400;

/// Share of the code's width a centred logo may cover.
const LOGO_FRACTION: u32 = 5;

pub struct QrService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> QrService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Encode `data` as a PNG QR code, optionally with a logo in the middle.
    pub fn create(&self, data: &str, logo: Option<&Path>, output: &Path) -> DsiResult<Vec<u8>> {
        let png = render_png(data, logo)?;
        self.store.write(output, &png)?;

        info!(
            output = %output.display(),
            bytes = data.len(),
            logo = logo.is_some(),
            "QR code written"
        );
        Ok(png)
    }
}

pub fn render_png(data: &str, logo: Option<&Path>) -> DsiResult<Vec<u8>> {
    let data = data.trim();
    if data.is_empty() {
        return Err(DsiError::validation("input", "nothing to encode"));
    }

    // A logo hides modules, which only the highest correction level survives.
    let level = if logo.is_some() { EcLevel::H } else { EcLevel::M };
    let code = QrCode::with_error_correction_level(data.as_bytes(), level).map_err(|e| {
        DsiError::validation("input", format!("cannot be encoded as a QR code: {}", e))
    })?;
    debug!(version = ?code.version(), width = code.width(), "QR code encoded");

    let modules = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE, MIN_SIZE)
        .build();
    let mut canvas = DynamicImage::ImageLuma8(modules).to_rgba8();

    if let Some(path) = logo {
        overlay_logo(&mut canvas, path)?;
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

fn overlay_logo(canvas: &mut RgbaImage, path: &Path) -> DsiResult<()> {
    let side = canvas.width() / LOGO_FRACTION;
    let logo = image::open(path)?
        .resize(side, side, FilterType::Lanczos3)
        .to_rgba8();

    let x = (canvas.width() - logo.width()) / 2;
    let y = (canvas.height() - logo.height()) / 2;
    imageops::overlay(canvas, &logo, i64::from(x), i64::from(y));
    Ok(())
}
