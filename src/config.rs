//! Rendering and service configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Encoded output format for rasterized pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless (default, best for OCR)
    #[default]
    Png,
    /// Lossy, honours `RenderConfig::quality`
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Opaque or translucent RGBA color, written as `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BackgroundColor {
    pub const WHITE: BackgroundColor = BackgroundColor {
        r: 0xff,
        g: 0xff,
        b: 0xff,
        a: 0xff,
    };
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for BackgroundColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument {
            reason: format!("background color must be #rrggbb or #rrggbbaa, got {:?}", s),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 0xff },
        })
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for BackgroundColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BackgroundColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl schemars::JsonSchema for BackgroundColor {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "BackgroundColor".into()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        <String as schemars::JsonSchema>::json_schema(generator)
    }
}

fn default_scale() -> f32 {
    2.0
}

fn default_quality() -> f32 {
    0.92
}

/// Page rasterization options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RenderConfig {
    /// Scale factor relative to the page's point size (default: 2.0, tuned for OCR)
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Output format (default: png)
    #[serde(default)]
    pub format: ImageFormat,
    /// JPEG quality in 0.0-1.0 (default: 0.92, ignored for PNG)
    #[serde(default = "default_quality")]
    pub quality: f32,
    /// Fill painted under the page; PDFs may be transparent (default: #ffffff)
    #[serde(default)]
    pub background: BackgroundColor,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            format: ImageFormat::Png,
            quality: default_quality(),
            background: BackgroundColor::WHITE,
        }
    }
}

impl RenderConfig {
    /// Reject scales and qualities the rasterizer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidArgument {
                reason: format!("scale must be a positive number, got {}", self.scale),
            });
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::InvalidArgument {
                reason: format!("quality must be within 0.0-1.0, got {}", self.quality),
            });
        }
        Ok(())
    }

    /// JPEG encoder quality (1-100)
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Language code used when a caller does not pass one (default: "eng")
    pub default_language: String,
    /// Rasterization defaults for OCR and image rendering
    pub render: RenderConfig,
    /// Directories searched for the PDFium shared library, in order,
    /// before falling back to the system library
    pub pdfium_library_dirs: Vec<PathBuf>,
    /// Tesseract data directory (`None` uses the engine's default)
    pub tessdata_dir: Option<PathBuf>,
    /// Maximum scale factor accepted from a caller (default: 10.0)
    pub max_render_scale: f32,
    /// Maximum rendered pixel area accepted from a caller (default: 100_000_000)
    pub max_render_pixels: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_language: "eng".to_string(),
            render: RenderConfig::default(),
            pdfium_library_dirs: vec![PathBuf::from("./"), PathBuf::from("/opt/pdfium/lib")],
            tessdata_dir: None,
            max_render_scale: 10.0,
            max_render_pixels: 100_000_000,
        }
    }
}

impl ServiceConfig {
    /// Validate a caller-supplied render config against this service's limits.
    pub fn check_render(&self, render: &RenderConfig) -> Result<()> {
        render.validate()?;
        if render.scale > self.max_render_scale {
            return Err(Error::InvalidArgument {
                reason: format!(
                    "scale {} exceeds maximum of {}",
                    render.scale, self.max_render_scale
                ),
            });
        }
        Ok(())
    }
}
