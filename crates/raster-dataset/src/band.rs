//! Per-band descriptors and the lazily-built color table.

use std::collections::BTreeMap;

use coverage_store::Palette;
use raster_common::{ColorInterp, DataType};

/// RGBA color table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

/// Decoded color table for palette bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    pub entries: Vec<ColorEntry>,
}

/// One channel of a resolved dataset level.
///
/// Band indices are 1-based. All bands of one level share block size and
/// data-type layout.
#[derive(Debug, Clone)]
pub struct RasterBand {
    index: u8,
    data_type: DataType,
    bits: u8,
    signed: bool,
    block_width: u32,
    block_height: u32,
    color_interp: ColorInterp,
    no_data: Option<f64>,
    metadata: BTreeMap<String, String>,
    palette: Option<Palette>,
    color_table: Option<ColorTable>,
}

impl RasterBand {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        index: u8,
        data_type: DataType,
        bits: u8,
        signed: bool,
        block_width: u32,
        block_height: u32,
        color_interp: ColorInterp,
        no_data: Option<f64>,
        metadata: BTreeMap<String, String>,
        palette: Option<Palette>,
    ) -> Self {
        Self {
            index,
            data_type,
            bits,
            signed,
            block_width,
            block_height,
            color_interp,
            no_data,
            metadata,
            palette,
            color_table: None,
        }
    }

    /// Lightweight derivative for an overview level: same descriptors, fresh
    /// lazy color table, no statistics metadata.
    pub(crate) fn derive_for_overview(&self) -> Self {
        let metadata = self
            .metadata
            .iter()
            .filter(|(key, _)| !key.starts_with("STATISTICS_"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            index: self.index,
            data_type: self.data_type,
            bits: self.bits,
            signed: self.signed,
            block_width: self.block_width,
            block_height: self.block_height,
            color_interp: self.color_interp,
            no_data: self.no_data,
            metadata,
            palette: self.palette.clone(),
            color_table: None,
        }
    }

    /// 1-based band index.
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Advertised bit depth (may differ from the container width).
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn block_size(&self) -> (u32, u32) {
        (self.block_width, self.block_height)
    }

    pub fn color_interp(&self) -> ColorInterp {
        self.color_interp
    }

    /// Scalar no-data value; always `None` when the dataset has more than
    /// one band (the combined vector is dataset metadata instead).
    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Decoded color table, built on first access from the stored palette.
    ///
    /// The entry matching the band's no-data index gets alpha 0, every
    /// other entry alpha 255.
    pub fn color_table(&mut self) -> Option<&ColorTable> {
        if self.color_table.is_none() {
            let palette = self.palette.as_ref()?;
            let transparent = self.no_data.map(|v| v as usize);
            let entries = palette
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| ColorEntry {
                    red: e.red,
                    green: e.green,
                    blue: e.blue,
                    alpha: if transparent == Some(i) { 0 } else { 255 },
                })
                .collect();
            self.color_table = Some(ColorTable { entries });
        }
        self.color_table.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_store::PaletteEntry;

    fn palette_band(no_data: Option<f64>) -> RasterBand {
        let palette = Palette {
            entries: vec![
                PaletteEntry {
                    red: 0,
                    green: 0,
                    blue: 0,
                },
                PaletteEntry {
                    red: 255,
                    green: 0,
                    blue: 0,
                },
            ],
        };
        RasterBand::new(
            1,
            DataType::U8,
            8,
            false,
            512,
            512,
            ColorInterp::PaletteIndex,
            no_data,
            BTreeMap::new(),
            Some(palette),
        )
    }

    #[test]
    fn test_color_table_alpha_for_no_data_index() {
        let mut band = palette_band(Some(1.0));
        let table = band.color_table().unwrap();
        assert_eq!(table.entries[0].alpha, 255);
        assert_eq!(table.entries[1].alpha, 0);
        assert_eq!(table.entries[1].red, 255);
    }

    #[test]
    fn test_color_table_absent_without_palette() {
        let mut band = RasterBand::new(
            1,
            DataType::U8,
            8,
            false,
            512,
            512,
            ColorInterp::Gray,
            None,
            BTreeMap::new(),
            None,
        );
        assert!(band.color_table().is_none());
    }

    #[test]
    fn test_overview_derivative_drops_statistics() {
        let mut metadata = BTreeMap::new();
        metadata.insert("NBITS".to_string(), "4".to_string());
        metadata.insert("STATISTICS_MINIMUM".to_string(), "0".to_string());
        let band = RasterBand::new(
            1,
            DataType::U8,
            4,
            false,
            256,
            256,
            ColorInterp::Gray,
            Some(15.0),
            metadata,
            None,
        );
        let derived = band.derive_for_overview();
        assert_eq!(derived.metadata().get("NBITS").map(String::as_str), Some("4"));
        assert!(!derived.metadata().contains_key("STATISTICS_MINIMUM"));
        assert_eq!(derived.no_data(), Some(15.0));
        assert_eq!(derived.block_size(), (256, 256));
    }
}
