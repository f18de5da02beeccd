//! In-memory implementation of both storage seams.
//!
//! Sections are held as band-interleaved base-resolution mosaics; raw
//! extraction serves any window at any resolution by nearest-neighbor
//! lookup, which is exact for aligned base-level reads and adequate for
//! pyramid levels. Transactions snapshot the whole state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use coverage_store::{
    BandStatistics, Coverage, CoverageEntry, CoverageRegistry, PyramidRow, RasterStore,
    RawDataRequest, SectionEntry, SectionGeometry, TileEngine, TileLoadJob, TileRequest,
};
use raster_common::{
    Extent, Pixel, PixelType, RasterError, RasterResult, SampleType,
};

/// One stored section: geometry plus its base-resolution mosaic.
#[derive(Debug, Clone)]
pub struct SectionData {
    pub id: i64,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub x_res: f64,
    pub y_res: f64,
    pub extent: Extent,
    /// Band-interleaved pixels, one container-sized slot per sample.
    pub pixels: Vec<u8>,
    pub summary: Option<String>,
    pub pyramid: Vec<PyramidRow>,
}

#[derive(Debug, Clone)]
pub struct CoverageData {
    pub definition: Coverage,
    pub title: Option<String>,
    pub abstract_: Option<String>,
    pub sections: Vec<SectionData>,
    pub pyramid: Vec<PyramidRow>,
    pub persisted_overviews: Vec<(f64, f64)>,
    /// Registered extent; when unset the union of section extents serves.
    pub extent: Option<Extent>,
}

#[derive(Debug, Clone, Default)]
struct State {
    coverages: BTreeMap<String, CoverageData>,
    srids: BTreeMap<i32, String>,
    next_section_id: i64,
    /// Fault injection: drop this many trailing bytes from every raw read.
    read_shortfall: usize,
}

/// In-memory raster store; [`MemoryStore::raster_store`] hands out seam
/// implementations sharing this state.
pub struct MemoryStore {
    path: String,
    state: Rc<RefCell<State>>,
}

impl MemoryStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: Rc::new(RefCell::new(State {
                next_section_id: 1,
                ..State::default()
            })),
        }
    }

    /// A store handle whose registry and engine share this state.
    pub fn raster_store(&self) -> RasterStore {
        RasterStore::new(
            self.path.clone(),
            Box::new(MemoryRegistry {
                state: Rc::clone(&self.state),
            }),
            Box::new(MemoryEngine {
                state: Rc::clone(&self.state),
                snapshot: None,
            }),
        )
    }

    pub fn add_srid(&self, srid: i32, wkt: impl Into<String>) {
        self.state.borrow_mut().srids.insert(srid, wkt.into());
    }

    pub fn add_coverage(&self, definition: Coverage) {
        let name = definition.name.clone();
        self.state.borrow_mut().coverages.insert(
            name,
            CoverageData {
                definition,
                title: None,
                abstract_: None,
                sections: Vec::new(),
                pyramid: Vec::new(),
                persisted_overviews: Vec::new(),
                extent: None,
            },
        );
    }

    pub fn set_coverage_text(&self, coverage: &str, title: Option<&str>, abstract_: Option<&str>) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        data.title = title.map(str::to_string);
        data.abstract_ = abstract_.map(str::to_string);
    }

    /// Seed a section with an explicit mosaic at the coverage's base
    /// resolution. Returns the section id.
    pub fn add_section(
        &self,
        coverage: &str,
        name: &str,
        extent: Extent,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> i64 {
        let (x_res, y_res) = {
            let state = self.state.borrow();
            let data = state.coverages.get(coverage).expect("unknown coverage");
            (data.definition.x_res, data.definition.y_res)
        };
        self.add_section_with_resolution(coverage, name, extent, width, height, x_res, y_res, pixels)
    }

    /// Seed a section at its own base resolution, for mixed-resolutions
    /// coverages. Returns the section id.
    #[allow(clippy::too_many_arguments)]
    pub fn add_section_with_resolution(
        &self,
        coverage: &str,
        name: &str,
        extent: Extent,
        width: u32,
        height: u32,
        x_res: f64,
        y_res: f64,
        pixels: Vec<u8>,
    ) -> i64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_section_id;
        state.next_section_id += 1;
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        data.sections.push(SectionData {
            id,
            name: name.to_string(),
            width,
            height,
            x_res,
            y_res,
            extent,
            pixels,
            summary: None,
            pyramid: Vec::new(),
        });
        id
    }

    pub fn set_section_summary(&self, coverage: &str, section: i64, summary: &str) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        let section = data
            .sections
            .iter_mut()
            .find(|s| s.id == section)
            .expect("unknown section");
        section.summary = Some(summary.to_string());
    }

    pub fn set_pyramid(&self, coverage: &str, rows: Vec<PyramidRow>) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        data.pyramid = rows;
    }

    pub fn set_section_pyramid(&self, coverage: &str, section: i64, rows: Vec<PyramidRow>) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        let section = data
            .sections
            .iter_mut()
            .find(|s| s.id == section)
            .expect("unknown section");
        section.pyramid = rows;
    }

    /// Register a coverage extent directly, without seeding sections.
    pub fn set_coverage_extent(&self, coverage: &str, extent: Extent) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        data.extent = Some(extent);
    }

    pub fn set_persisted_overviews(&self, coverage: &str, resolutions: Vec<(f64, f64)>) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        data.persisted_overviews = resolutions;
    }

    /// Overwrite a section's mosaic in place, keeping its geometry.
    pub fn replace_section_pixels(&self, coverage: &str, section: i64, pixels: Vec<u8>) {
        let mut state = self.state.borrow_mut();
        let data = state.coverages.get_mut(coverage).expect("unknown coverage");
        let section = data
            .sections
            .iter_mut()
            .find(|s| s.id == section)
            .expect("unknown section");
        assert_eq!(section.pixels.len(), pixels.len(), "mosaic shape must match");
        section.pixels = pixels;
    }

    /// Make every subsequent raw read come back short by `bytes`.
    pub fn set_read_shortfall(&self, bytes: usize) {
        self.state.borrow_mut().read_shortfall = bytes;
    }

    /// Snapshot of a coverage's stored state, for assertions.
    pub fn coverage_data(&self, coverage: &str) -> Option<CoverageData> {
        self.state.borrow().coverages.get(coverage).cloned()
    }

    pub fn coverage_count(&self) -> usize {
        self.state.borrow().coverages.len()
    }
}

struct MemoryRegistry {
    state: Rc<RefCell<State>>,
}

impl CoverageRegistry for MemoryRegistry {
    fn list_coverages(&self) -> RasterResult<Vec<CoverageEntry>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .values()
            .map(|data| CoverageEntry {
                name: data.definition.name.clone(),
                title: data.title.clone(),
                abstract_: data.abstract_.clone(),
            })
            .collect())
    }

    fn coverage_entry(&self, coverage: &str) -> RasterResult<Option<CoverageEntry>> {
        let state = self.state.borrow();
        Ok(state.coverages.get(coverage).map(|data| CoverageEntry {
            name: data.definition.name.clone(),
            title: data.title.clone(),
            abstract_: data.abstract_.clone(),
        }))
    }

    fn coverage_extent(&self, coverage: &str) -> RasterResult<Option<Extent>> {
        let state = self.state.borrow();
        let data = match state.coverages.get(coverage) {
            Some(data) => data,
            None => return Ok(None),
        };
        if let Some(extent) = data.extent {
            return Ok(Some(extent));
        }
        let mut union: Option<Extent> = None;
        for section in &data.sections {
            union = Some(match union {
                None => section.extent,
                Some(current) => Extent::new(
                    current.min_x.min(section.extent.min_x),
                    current.min_y.min(section.extent.min_y),
                    current.max_x.max(section.extent.max_x),
                    current.max_y.max(section.extent.max_y),
                ),
            });
        }
        Ok(union)
    }

    fn srs_wkt(&self, srid: i32) -> RasterResult<Option<String>> {
        Ok(self.state.borrow().srids.get(&srid).cloned())
    }

    fn srid_exists(&self, srid: i32) -> RasterResult<bool> {
        Ok(self.state.borrow().srids.contains_key(&srid))
    }

    fn pyramid_rows(&self, coverage: &str) -> RasterResult<Vec<PyramidRow>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .map(|data| data.pyramid.clone())
            .unwrap_or_default())
    }

    fn section_pyramid_rows(
        &self,
        coverage: &str,
        section: i64,
    ) -> RasterResult<Vec<PyramidRow>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .and_then(|data| data.sections.iter().find(|s| s.id == section))
            .map(|s| s.pyramid.clone())
            .unwrap_or_default())
    }

    fn sections(&self, coverage: &str) -> RasterResult<Vec<SectionEntry>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .map(|data| {
                data.sections
                    .iter()
                    .map(|s| SectionEntry {
                        id: s.id,
                        name: s.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn section_summary(&self, coverage: &str, section: i64) -> RasterResult<Option<String>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .and_then(|data| data.sections.iter().find(|s| s.id == section))
            .and_then(|s| s.summary.clone()))
    }

    fn persisted_overviews(&self, coverage: &str) -> RasterResult<Vec<(f64, f64)>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .map(|data| data.persisted_overviews.clone())
            .unwrap_or_default())
    }
}

struct MemoryEngine {
    state: Rc<RefCell<State>>,
    snapshot: Option<State>,
}

impl TileEngine for MemoryEngine {
    fn coverage(&self, name: &str) -> RasterResult<Option<Coverage>> {
        let state = self.state.borrow();
        Ok(state.coverages.get(name).map(|data| data.definition.clone()))
    }

    fn section_geometry(
        &self,
        coverage: &str,
        section: i64,
    ) -> RasterResult<Option<SectionGeometry>> {
        let state = self.state.borrow();
        Ok(state
            .coverages
            .get(coverage)
            .and_then(|data| data.sections.iter().find(|s| s.id == section))
            .map(|s| SectionGeometry {
                x_res: s.x_res,
                y_res: s.y_res,
                extent: s.extent,
            }))
    }

    fn read_raw(&self, request: &RawDataRequest) -> RasterResult<Vec<u8>> {
        let state = self.state.borrow();
        let data = state
            .coverages
            .get(request.coverage)
            .ok_or_else(|| RasterError::engine(format!("no coverage {}", request.coverage)))?;
        let definition = &data.definition;

        let storage_size = definition.sample_type.format().data_type.size_bytes();
        let out_size = request.sample_type.format().data_type.size_bytes();
        let bands = request.bands as usize;
        let expand_mono = definition.pixel_type == PixelType::Monochrome
            && definition.sample_type == SampleType::U1
            && request.sample_type == SampleType::U8;

        let mut out =
            Vec::with_capacity(request.width as usize * request.height as usize * bands * out_size);
        for row in 0..request.height {
            let world_y = request.extent.max_y - (row as f64 + 0.5) * request.y_res;
            for col in 0..request.width {
                let world_x = request.extent.min_x + (col as f64 + 0.5) * request.x_res;
                let hit = data
                    .sections
                    .iter()
                    .filter(|s| request.section.map_or(true, |id| s.id == id))
                    .find_map(|s| {
                        if !s.extent.contains(world_x, world_y) {
                            return None;
                        }
                        let src_col = ((world_x - s.extent.min_x) / s.x_res) as i64;
                        let src_row = ((s.extent.max_y - world_y) / s.y_res) as i64;
                        if src_col < 0
                            || src_row < 0
                            || src_col >= s.width as i64
                            || src_row >= s.height as i64
                        {
                            return None;
                        }
                        let offset = (src_row as usize * s.width as usize + src_col as usize)
                            * bands
                            * storage_size;
                        Some(&s.pixels[offset..offset + bands * storage_size])
                    });
                match hit {
                    Some(pixel) => {
                        if expand_mono {
                            for band in 0..bands {
                                let bit = pixel[band * storage_size];
                                out.push(if bit != 0 { 255 } else { 0 });
                            }
                        } else {
                            out.extend_from_slice(pixel);
                        }
                    }
                    None => {
                        push_fill(&mut out, request, bands, expand_mono);
                    }
                }
            }
        }
        out.truncate(out.len().saturating_sub(state.read_shortfall));
        Ok(out)
    }

    fn coverage_statistics(
        &self,
        coverage: &str,
    ) -> RasterResult<Option<Vec<BandStatistics>>> {
        let state = self.state.borrow();
        let data = match state.coverages.get(coverage) {
            Some(data) => data,
            None => return Ok(None),
        };
        if data.sections.iter().all(|s| s.pixels.is_empty()) {
            return Ok(None);
        }
        let bands = data.definition.bands as usize;
        let sample = data.definition.sample_type;
        let size = sample.format().data_type.size_bytes();

        let mut stats = vec![(f64::INFINITY, f64::NEG_INFINITY, 0.0f64, 0.0f64, 0u64); bands];
        for section in &data.sections {
            let stride = bands * size;
            for pixel in section.pixels.chunks_exact(stride) {
                for band in 0..bands {
                    let value = decode_sample(sample, &pixel[band * size..(band + 1) * size]);
                    let entry = &mut stats[band];
                    entry.0 = entry.0.min(value);
                    entry.1 = entry.1.max(value);
                    entry.2 += value;
                    entry.3 += value * value;
                    entry.4 += 1;
                }
            }
        }
        Ok(Some(
            stats
                .into_iter()
                .map(|(min, max, sum, sum_sq, count)| {
                    let n = count.max(1) as f64;
                    let mean = sum / n;
                    BandStatistics {
                        min,
                        max,
                        mean,
                        stddev: (sum_sq / n - mean * mean).max(0.0).sqrt(),
                    }
                })
                .collect(),
        ))
    }

    fn begin(&mut self) -> RasterResult<()> {
        if self.snapshot.is_some() {
            return Err(RasterError::engine("transaction already open"));
        }
        self.snapshot = Some(self.state.borrow().clone());
        Ok(())
    }

    fn commit(&mut self) -> RasterResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| RasterError::engine("no open transaction"))
    }

    fn rollback(&mut self) -> RasterResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| RasterError::engine("no open transaction"))?;
        *self.state.borrow_mut() = snapshot;
        Ok(())
    }

    fn create_coverage(&mut self, definition: &Coverage) -> RasterResult<()> {
        let mut state = self.state.borrow_mut();
        if state.coverages.contains_key(&definition.name) {
            return Err(RasterError::engine(format!(
                "coverage {} already exists",
                definition.name
            )));
        }
        state.coverages.insert(
            definition.name.clone(),
            CoverageData {
                definition: definition.clone(),
                title: None,
                abstract_: None,
                sections: Vec::new(),
                pyramid: Vec::new(),
                persisted_overviews: Vec::new(),
                extent: None,
            },
        );
        Ok(())
    }

    fn ingest_section(
        &mut self,
        job: &TileLoadJob,
        fill: &mut dyn FnMut(&TileRequest) -> RasterResult<Vec<u8>>,
    ) -> RasterResult<i64> {
        let definition = self
            .coverage(&job.coverage)?
            .ok_or_else(|| RasterError::engine(format!("no coverage {}", job.coverage)))?;
        let bands = definition.bands as usize;
        let size = definition.sample_type.format().data_type.size_bytes();
        let pixel_size = bands * size;
        let (tile_w, tile_h) = (definition.tile_width, definition.tile_height);

        let mut mosaic = vec![0u8; job.width as usize * job.height as usize * pixel_size];
        let tiles_x = job.width.div_ceil(tile_w);
        let tiles_y = job.height.div_ceil(tile_h);
        for tile_y in 0..tiles_y {
            for tile_x in 0..tiles_x {
                let request = TileRequest {
                    tile_x,
                    tile_y,
                    offset_x: tile_x * tile_w,
                    offset_y: tile_y * tile_h,
                };
                let buffer = fill(&request)?;
                let expected = tile_w as usize * tile_h as usize * pixel_size;
                if buffer.len() != expected {
                    return Err(RasterError::BlockSizeMismatch {
                        expected,
                        actual: buffer.len(),
                    });
                }
                let copy_w = (job.width - request.offset_x).min(tile_w) as usize;
                let copy_h = (job.height - request.offset_y).min(tile_h) as usize;
                for row in 0..copy_h {
                    let src = row * tile_w as usize * pixel_size;
                    let dst = ((request.offset_y as usize + row) * job.width as usize
                        + request.offset_x as usize)
                        * pixel_size;
                    mosaic[dst..dst + copy_w * pixel_size]
                        .copy_from_slice(&buffer[src..src + copy_w * pixel_size]);
                }
            }
        }

        let mut state = self.state.borrow_mut();
        let id = state.next_section_id;
        state.next_section_id += 1;
        let data = state
            .coverages
            .get_mut(&job.coverage)
            .ok_or_else(|| RasterError::engine(format!("no coverage {}", job.coverage)))?;
        debug!(
            coverage = %job.coverage,
            section = %job.section,
            id,
            tiles = tiles_x * tiles_y,
            "assembled section mosaic"
        );
        data.sections.push(SectionData {
            id,
            name: job.section.clone(),
            width: job.width,
            height: job.height,
            x_res: data.definition.x_res,
            y_res: data.definition.y_res,
            extent: job.extent,
            pixels: mosaic,
            summary: None,
            pyramid: Vec::new(),
        });
        Ok(id)
    }

    fn build_pyramid(
        &mut self,
        coverage: &str,
        _section: Option<&str>,
        _strict_resolution: bool,
    ) -> RasterResult<()> {
        let mut state = self.state.borrow_mut();
        let data = state
            .coverages
            .get_mut(coverage)
            .ok_or_else(|| RasterError::engine(format!("no coverage {}", coverage)))?;
        let (x_res, y_res) = (data.definition.x_res, data.definition.y_res);
        data.pyramid = vec![pyramid_row(x_res, y_res)];
        for section in &mut data.sections {
            section.pyramid = vec![pyramid_row(section.x_res, section.y_res)];
        }
        Ok(())
    }
}

fn pyramid_row(x_res: f64, y_res: f64) -> PyramidRow {
    PyramidRow {
        resolutions: (0..4)
            .map(|factor| {
                let scale = (1u32 << factor) as f64;
                (x_res * scale, y_res * scale)
            })
            .collect(),
    }
}

fn push_fill(out: &mut Vec<u8>, request: &RawDataRequest, bands: usize, expand_mono: bool) {
    match request.no_data {
        Some(pixel) => {
            for band in 0..bands {
                let value = pixel.value_as_f64(band).unwrap_or(0.0);
                if expand_mono {
                    out.push(if value != 0.0 { 255 } else { 0 });
                } else {
                    push_value(out, request.sample_type, value);
                }
            }
        }
        None => {
            let size = request.sample_type.format().data_type.size_bytes();
            out.extend(std::iter::repeat(0u8).take(bands * size));
        }
    }
}

fn push_value(out: &mut Vec<u8>, sample: SampleType, value: f64) {
    match sample {
        SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8 => {
            out.push(value as u8)
        }
        SampleType::I8 => out.push(value as i8 as u8),
        SampleType::U16 => out.extend_from_slice(&(value as u16).to_ne_bytes()),
        SampleType::I16 => out.extend_from_slice(&(value as i16).to_ne_bytes()),
        SampleType::U32 => out.extend_from_slice(&(value as u32).to_ne_bytes()),
        SampleType::I32 => out.extend_from_slice(&(value as i32).to_ne_bytes()),
        SampleType::F32 => out.extend_from_slice(&(value as f32).to_ne_bytes()),
        SampleType::F64 => out.extend_from_slice(&value.to_ne_bytes()),
    }
}

fn decode_sample(sample: SampleType, bytes: &[u8]) -> f64 {
    match sample {
        SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8 => bytes[0] as f64,
        SampleType::I8 => bytes[0] as i8 as f64,
        SampleType::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        SampleType::I16 => i16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        SampleType::U32 => {
            u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        SampleType::I32 => {
            i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        SampleType::F32 => {
            f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        SampleType::F64 => f64::from_ne_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

/// Convenience: a default no-data-less coverage definition for seeding.
pub fn coverage_definition(
    name: &str,
    sample_type: SampleType,
    pixel_type: PixelType,
    bands: u8,
    tile_size: u32,
    x_res: f64,
    y_res: f64,
) -> Coverage {
    Coverage {
        name: name.to_string(),
        sample_type,
        pixel_type,
        bands,
        compression: raster_common::Compression::None,
        quality: 100,
        tile_width: tile_size,
        tile_height: tile_size,
        srid: 4326,
        x_res,
        y_res,
        strict_resolution: true,
        mixed_resolutions: false,
        section_paths: false,
        section_md5: false,
        section_summaries: false,
        no_data: None,
        palette: None,
    }
}

/// A no-data pixel matching a coverage definition, with every band set to
/// `value`.
pub fn uniform_no_data(definition: &Coverage, value: f64) -> Pixel {
    let mut pixel = Pixel::new(definition.sample_type, definition.pixel_type, definition.bands);
    for band in 0..definition.bands as usize {
        match definition.sample_type {
            SampleType::U1 | SampleType::U2 | SampleType::U4 | SampleType::U8 => {
                pixel.set_u8(band, value as u8)
            }
            SampleType::I8 => pixel.set_i8(band, value as i8),
            SampleType::U16 => pixel.set_u16(band, value as u16),
            SampleType::I16 => pixel.set_i16(band, value as i16),
            SampleType::U32 => pixel.set_u32(band, value as u32),
            SampleType::I32 => pixel.set_i32(band, value as i32),
            SampleType::F32 => pixel.set_f32(band, value as f32),
            SampleType::F64 => pixel.set_f64(band, value),
        }
    }
    pixel
}
