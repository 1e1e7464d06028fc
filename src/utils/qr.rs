//! QR-code encoding collaborator
//!
//! The generator only needs `encode(text, options) -> image data`. The
//! bundled [`SvgQrEncoder`] renders an SVG and returns it as a data URL.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::errors::{CoasterError, Result};

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<QrErrorCorrection> for EcLevel {
    fn from(level: QrErrorCorrection) -> Self {
        match level {
            QrErrorCorrection::L => EcLevel::L,
            QrErrorCorrection::M => EcLevel::M,
            QrErrorCorrection::Q => EcLevel::Q,
            QrErrorCorrection::H => EcLevel::H,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Minimum rendered width in pixels
    pub width: u32,
    /// Quiet zone switch: 0 renders without one, any other value renders
    /// the fixed 4-module zone of the `qrcode` renderer, which takes no width
    pub margin: u32,
    pub error_correction: QrErrorCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            width: 256,
            margin: 2,
            error_correction: QrErrorCorrection::M,
        }
    }
}

#[async_trait]
pub trait QrEncoder: Send + Sync {
    /// Encode `text` and return the image as a data URL
    async fn encode(&self, text: &str, options: QrOptions) -> Result<String>;
}

/// SVG renderer backed by the `qrcode` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgQrEncoder;

impl SvgQrEncoder {
    fn render(text: &str, options: QrOptions) -> Result<String> {
        let code = QrCode::with_error_correction_level(
            text.as_bytes(),
            options.error_correction.into(),
        )
        .map_err(|e| CoasterError::qr_encoding(format!("Failed to encode '{}': {}", text, e)))?;

        let image = code
            .render::<svg::Color>()
            .min_dimensions(options.width, options.width)
            .quiet_zone(options.margin > 0)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        trace!("SvgQrEncoder: rendered {} bytes of SVG", image.len());
        Ok(format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(image.as_bytes())
        ))
    }
}

#[async_trait]
impl QrEncoder for SvgQrEncoder {
    async fn encode(&self, text: &str, options: QrOptions) -> Result<String> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || Self::render(&text, options))
            .await
            .unwrap_or_else(|e| {
                warn!("QR encoding task failed: {}", e);
                Err(CoasterError::qr_encoding(format!(
                    "QR encoding task failed: {}",
                    e
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_returns_svg_data_url() {
        let url = SvgQrEncoder
            .encode("https://m1ct.coffee/bean/geisha", QrOptions::default())
            .await
            .unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));

        let payload = url.trim_start_matches("data:image/svg+xml;base64,");
        let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = SvgQrEncoder::render("same", QrOptions::default()).unwrap();
        let b = SvgQrEncoder::render("same", QrOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_margin_only_toggles_quiet_zone() {
        let with = |margin| {
            SvgQrEncoder::render(
                "https://m1ct.coffee/bean/geisha",
                QrOptions {
                    margin,
                    ..Default::default()
                },
            )
            .unwrap()
        };
        assert_eq!(with(2), with(8));
        assert_ne!(with(0), with(2));
    }
}
