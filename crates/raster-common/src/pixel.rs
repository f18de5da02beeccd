//! Pixel format translation tables.
//!
//! Maps the storage model's sample/pixel-type enumerations onto the generic
//! consumer representation (container data type, bit depth, signedness,
//! color interpretation) and carries the compression and default no-data
//! tables shared by the open and create paths.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, RasterResult};

/// Storage-level sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    U1,
    U2,
    U4,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

/// Storage-level pixel (channel layout) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    Monochrome,
    Palette,
    Grayscale,
    Rgb,
    Multiband,
    DataGrid,
}

/// Consumer-side container data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

/// Consumer representation of one sample: container, bit depth, signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub data_type: DataType,
    pub bits: u8,
    pub signed: bool,
}

impl DataType {
    /// Size of one sample in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

impl SampleType {
    /// The consumer-side format for this sample type.
    ///
    /// Sub-byte samples use an 8-bit unsigned container; floats are
    /// reported as signed.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleType::U1 => SampleFormat {
                data_type: DataType::U8,
                bits: 1,
                signed: false,
            },
            SampleType::U2 => SampleFormat {
                data_type: DataType::U8,
                bits: 2,
                signed: false,
            },
            SampleType::U4 => SampleFormat {
                data_type: DataType::U8,
                bits: 4,
                signed: false,
            },
            SampleType::I8 => SampleFormat {
                data_type: DataType::U8,
                bits: 8,
                signed: true,
            },
            SampleType::U8 => SampleFormat {
                data_type: DataType::U8,
                bits: 8,
                signed: false,
            },
            SampleType::I16 => SampleFormat {
                data_type: DataType::I16,
                bits: 16,
                signed: true,
            },
            SampleType::U16 => SampleFormat {
                data_type: DataType::U16,
                bits: 16,
                signed: false,
            },
            SampleType::I32 => SampleFormat {
                data_type: DataType::I32,
                bits: 32,
                signed: true,
            },
            SampleType::U32 => SampleFormat {
                data_type: DataType::U32,
                bits: 32,
                signed: false,
            },
            SampleType::F32 => SampleFormat {
                data_type: DataType::F32,
                bits: 32,
                signed: true,
            },
            SampleType::F64 => SampleFormat {
                data_type: DataType::F64,
                bits: 64,
                signed: true,
            },
        }
    }

    /// Reverse mapping for the create path.
    ///
    /// Unsigned 8-bit is the only byte mapping; sub-byte types are never
    /// inferred from a consumer data type.
    pub fn from_data_type(dt: DataType) -> SampleType {
        match dt {
            DataType::U8 => SampleType::U8,
            DataType::I16 => SampleType::I16,
            DataType::U16 => SampleType::U16,
            DataType::I32 => SampleType::I32,
            DataType::U32 => SampleType::U32,
            DataType::F32 => SampleType::F32,
            DataType::F64 => SampleType::F64,
        }
    }
}

impl PixelType {
    /// Parse a PIXEL_TYPE creation-option value.
    pub fn from_option_name(name: &str) -> Option<PixelType> {
        match name.to_ascii_uppercase().as_str() {
            "GRAYSCALE" => Some(PixelType::Grayscale),
            "RGB" => Some(PixelType::Rgb),
            "MULTIBAND" => Some(PixelType::Multiband),
            "DATAGRID" => Some(PixelType::DataGrid),
            _ => None,
        }
    }
}

/// Color interpretation of one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorInterp {
    Undefined,
    Gray,
    PaletteIndex,
    Red,
    Green,
    Blue,
}

impl ColorInterp {
    /// Interpretation for band `band_index` (0-based) of a pixel type.
    pub fn for_band(pixel_type: PixelType, band_index: usize) -> ColorInterp {
        match pixel_type {
            PixelType::Monochrome | PixelType::Grayscale => ColorInterp::Gray,
            PixelType::Palette => ColorInterp::PaletteIndex,
            PixelType::Rgb => match band_index {
                0 => ColorInterp::Red,
                1 => ColorInterp::Green,
                2 => ColorInterp::Blue,
                _ => ColorInterp::Undefined,
            },
            _ => ColorInterp::Undefined,
        }
    }
}

/// Tile compression kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    None,
    Deflate,
    DeflateNoDelta,
    Lzma,
    LzmaNoDelta,
    Gif,
    Jpeg,
    Png,
    LossyWebp,
    LosslessWebp,
    CcittFax3,
    CcittFax4,
    Lzw,
    Charls,
    LossyJp2,
    LosslessJp2,
}

impl Compression {
    /// Display name surfaced in image-structure metadata.
    ///
    /// Returns `None` for kinds with no advertised name; those are simply
    /// omitted from metadata.
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            Compression::Deflate | Compression::DeflateNoDelta => Some("DEFLATE"),
            Compression::Lzma | Compression::LzmaNoDelta => Some("LZMA"),
            Compression::Gif => Some("GIF"),
            Compression::Jpeg => Some("JPEG"),
            Compression::Png => Some("PNG"),
            Compression::LossyWebp => Some("WEBP"),
            Compression::LosslessWebp => Some("WEBP_LOSSLESS"),
            Compression::CcittFax3 => Some("CCITTFAX3"),
            Compression::CcittFax4 => Some("CCITTFAX4"),
            Compression::Lzw => Some("LZW"),
            Compression::Charls => Some("JPEG_LOSSLESS"),
            Compression::LossyJp2 => Some("JPEG2000"),
            Compression::LosslessJp2 => Some("JPEG2000_LOSSLESS"),
            Compression::None => None,
        }
    }

    /// Whether quality metadata is meaningful for this kind.
    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            Compression::Jpeg | Compression::LossyWebp | Compression::LossyJp2
        )
    }

    /// Parse a COMPRESS creation-option value with its default quality.
    pub fn from_option_name(name: &str) -> Option<(Compression, i32)> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Some((Compression::None, 100)),
            "DEFLATE" => Some((Compression::Deflate, 100)),
            "LZMA" => Some((Compression::Lzma, 100)),
            "PNG" => Some((Compression::Png, 100)),
            "CCITTFAX4" => Some((Compression::CcittFax4, 100)),
            "JPEG" => Some((Compression::Jpeg, 75)),
            "WEBP" => Some((Compression::LossyWebp, 75)),
            "CHARLS" => Some((Compression::Charls, 100)),
            "JPEG2000" => Some((Compression::LossyJp2, 20)),
            _ => None,
        }
    }

    /// Apply an explicit quality, upgrading lossy WEBP/JPEG2000 at quality
    /// 100 to their lossless variants.
    pub fn with_quality(self, quality: i32) -> (Compression, i32) {
        match (self, quality) {
            (Compression::LossyJp2, 100) => (Compression::LosslessJp2, 100),
            (Compression::LossyWebp, 100) => (Compression::LosslessWebp, 100),
            (c, q) => (c, q),
        }
    }
}

/// A typed sample value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SampleValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    F64(f64),
}

/// A single pixel value: one typed sample per band.
///
/// Used for no-data pixels. Sub-byte samples (1/2/4-bit) are carried in an
/// unsigned 8-bit slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    sample_type: SampleType,
    pixel_type: PixelType,
    values: Vec<SampleValue>,
}

impl Pixel {
    /// Create a zero-initialized pixel.
    pub fn new(sample_type: SampleType, pixel_type: PixelType, bands: u8) -> Self {
        let zero = match sample_type {
            SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8 => SampleValue::U8(0),
            SampleType::I8 => SampleValue::I8(0),
            SampleType::U16 => SampleValue::U16(0),
            SampleType::I16 => SampleValue::I16(0),
            SampleType::U32 => SampleValue::U32(0),
            SampleType::I32 => SampleValue::I32(0),
            SampleType::F32 => SampleValue::F32(0.0),
            SampleType::F64 => SampleValue::F64(0.0),
        };
        Self {
            sample_type,
            pixel_type,
            values: vec![zero; bands as usize],
        }
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn bands(&self) -> u8 {
        self.values.len() as u8
    }

    /// Set an unsigned sample (sub-byte and 8-bit types).
    pub fn set_u8(&mut self, band: usize, value: u8) {
        self.values[band] = SampleValue::U8(value);
    }

    pub fn set_i8(&mut self, band: usize, value: i8) {
        self.values[band] = SampleValue::I8(value);
    }

    pub fn set_u16(&mut self, band: usize, value: u16) {
        self.values[band] = SampleValue::U16(value);
    }

    pub fn set_i16(&mut self, band: usize, value: i16) {
        self.values[band] = SampleValue::I16(value);
    }

    pub fn set_u32(&mut self, band: usize, value: u32) {
        self.values[band] = SampleValue::U32(value);
    }

    pub fn set_i32(&mut self, band: usize, value: i32) {
        self.values[band] = SampleValue::I32(value);
    }

    pub fn set_f32(&mut self, band: usize, value: f32) {
        self.values[band] = SampleValue::F32(value);
    }

    pub fn set_f64(&mut self, band: usize, value: f64) {
        self.values[band] = SampleValue::F64(value);
    }

    /// Extract the value of one band via the sample-type-specific accessor,
    /// widened to f64.
    ///
    /// Returns `None` when the stored slot does not match the pixel's
    /// declared sample type.
    pub fn value_as_f64(&self, band: usize) -> Option<f64> {
        let value = self.values.get(band)?;
        match (self.sample_type, value) {
            (
                SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8,
                SampleValue::U8(v),
            ) => Some(*v as f64),
            (SampleType::I8, SampleValue::I8(v)) => Some(*v as f64),
            (SampleType::U16, SampleValue::U16(v)) => Some(*v as f64),
            (SampleType::I16, SampleValue::I16(v)) => Some(*v as f64),
            (SampleType::U32, SampleValue::U32(v)) => Some(*v as f64),
            (SampleType::I32, SampleValue::I32(v)) => Some(*v as f64),
            (SampleType::F32, SampleValue::F32(v)) => Some(*v as f64),
            (SampleType::F64, SampleValue::F64(v)) => Some(*v),
            _ => None,
        }
    }

    /// Synthesize the default no-data pixel for a coverage definition.
    ///
    /// The per-pixel-type constants are historical convention: monochrome 0,
    /// grayscale brightest (u16 zero), RGB white (u16 zero), datagrid zero,
    /// multiband 255 per band (u16 zero).
    pub fn default_no_data(
        sample_type: SampleType,
        pixel_type: PixelType,
        bands: u8,
    ) -> RasterResult<Pixel> {
        let mut pixel = Pixel::new(sample_type, pixel_type, bands);
        let unsupported = || {
            RasterError::UnsupportedDataType(format!(
                "no default no-data for {:?}/{:?}",
                sample_type, pixel_type
            ))
        };
        match pixel_type {
            PixelType::Monochrome => match sample_type {
                SampleType::U1 => pixel.set_u8(0, 0),
                _ => return Err(unsupported()),
            },
            PixelType::Palette => match sample_type {
                SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8 => {
                    pixel.set_u8(0, 0)
                }
                _ => return Err(unsupported()),
            },
            PixelType::Grayscale => match sample_type {
                SampleType::U1 => pixel.set_u8(0, 1),
                SampleType::U2 => pixel.set_u8(0, 3),
                SampleType::U4 => pixel.set_u8(0, 15),
                SampleType::U8 => pixel.set_u8(0, 255),
                SampleType::U16 => pixel.set_u16(0, 0),
                _ => return Err(unsupported()),
            },
            PixelType::Rgb => match sample_type {
                SampleType::U8 => {
                    for band in 0..3 {
                        pixel.set_u8(band, 255);
                    }
                }
                SampleType::U16 => {
                    for band in 0..3 {
                        pixel.set_u16(band, 0);
                    }
                }
                _ => return Err(unsupported()),
            },
            PixelType::DataGrid => match sample_type {
                SampleType::I8 => pixel.set_i8(0, 0),
                SampleType::U8 => pixel.set_u8(0, 0),
                SampleType::I16 => pixel.set_i16(0, 0),
                SampleType::U16 => pixel.set_u16(0, 0),
                SampleType::I32 => pixel.set_i32(0, 0),
                SampleType::U32 => pixel.set_u32(0, 0),
                SampleType::F32 => pixel.set_f32(0, 0.0),
                SampleType::F64 => pixel.set_f64(0, 0.0),
                _ => return Err(unsupported()),
            },
            PixelType::Multiband => match sample_type {
                SampleType::U8 => {
                    for band in 0..bands as usize {
                        pixel.set_u8(band, 255);
                    }
                }
                SampleType::U16 => {
                    for band in 0..bands as usize {
                        pixel.set_u16(band, 0);
                    }
                }
                _ => return Err(unsupported()),
            },
        }
        Ok(pixel)
    }
}
