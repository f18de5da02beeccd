//! The create-copy ingestion pipeline.

use std::path::Path;

use tracing::{debug, info, warn};

use coverage_store::{Coverage, RasterStore, TileLoadJob, TileRequest};
use raster_common::{
    ColorInterp, ConnectionId, DataType, Extent, GeoTransform, Pixel, PixelType, RasterError,
    RasterResult, SampleType, SectionRef,
};
use raster_dataset::{open_subdataset, OpenOptions, OpenOutcome, RasterDataset};

use crate::options::CreateOptions;
use crate::source::SourceRaster;

/// Progress callback: receives the completed fraction, returns `false` to
/// cancel the ingestion.
pub type ProgressFn<'a> = dyn FnMut(f64) -> bool + 'a;

/// Copy a source raster into a coverage and reopen the result.
///
/// The whole write — coverage creation, tile streaming and pyramid build —
/// runs inside one transaction; any failure leaves the store uncommitted.
/// On success the target is reopened through the resolver and returned as a
/// fresh read-only dataset.
pub fn create_copy(
    mut store: RasterStore,
    source: &dyn SourceRaster,
    options: &CreateOptions,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> RasterResult<RasterDataset> {
    let band_count = source.band_count();
    if !(1..=255).contains(&band_count) {
        return Err(RasterError::UnsupportedBandCount(band_count));
    }
    let bands = band_count as u8;

    // Rejects rotation/shear before anything touches the store.
    let geo = GeoTransform::from_coefficients(&source.geo_transform())?;

    if options.append && options.coverage.is_none() {
        return Err(RasterError::MissingOption {
            option: "COVERAGE",
            required_with: "APPEND_SUBDATASET",
        });
    }

    let data_type = source.data_type();
    let pixel_type = match options.pixel_type {
        Some(pixel_type) => pixel_type,
        None => infer_pixel_type(source, bands, data_type)?,
    };
    validate_pixel_type(pixel_type, bands, data_type)?;
    let sample_type = SampleType::from_data_type(data_type);
    let (compression, quality) = options.resolved_compression();

    let default_name = file_stem(store.path());
    let coverage_name = options.coverage.clone().unwrap_or_else(|| default_name.clone());
    let section_name = options.section.clone().unwrap_or(default_name);

    let srid = match options.srid {
        Some(srid) => {
            if !store.registry().srid_exists(srid)? {
                warn!(srid, "explicit SRID is not registered in the store");
            }
            srid
        }
        None => source.srid().unwrap_or_else(|| {
            warn!("source carries no spatial reference, storing SRID -1");
            -1
        }),
    };

    let width = source.width();
    let height = source.height();
    let extent = geo.extent(width, height).normalized_y();

    let definition = Coverage {
        name: coverage_name.clone(),
        sample_type,
        pixel_type,
        bands,
        compression,
        quality,
        tile_width: options.block_width,
        tile_height: options.block_height,
        srid,
        x_res: geo.pixel_width,
        y_res: geo.pixel_height.abs(),
        strict_resolution: true,
        mixed_resolutions: false,
        section_paths: false,
        section_md5: false,
        section_summaries: false,
        no_data: Some(Pixel::default_no_data(sample_type, pixel_type, bands)?),
        palette: None,
    };

    store.engine_mut().begin()?;
    let ingested = ingest(
        &mut store,
        source,
        options,
        &definition,
        &section_name,
        extent,
        &mut progress,
    );
    let section_id = match ingested {
        Ok(section_id) => section_id,
        Err(err) => {
            let _ = store.engine_mut().rollback();
            return Err(err);
        }
    };
    store.engine_mut().commit()?;
    info!(
        coverage = %coverage_name,
        section = %section_name,
        width,
        height,
        "ingestion committed"
    );

    reopen(store, &coverage_name, section_id, &section_name)
}

/// The transactional body: resolve or create the coverage, stream tiles,
/// build the pyramid. Returns the new section's id.
fn ingest(
    store: &mut RasterStore,
    source: &dyn SourceRaster,
    options: &CreateOptions,
    definition: &Coverage,
    section_name: &str,
    extent: Extent,
    progress: &mut Option<&mut ProgressFn<'_>>,
) -> RasterResult<i64> {
    let existing = store.engine().coverage(&definition.name)?;
    let coverage = match (options.append, existing) {
        (true, Some(coverage)) => {
            if coverage.sample_type != definition.sample_type
                || coverage.pixel_type != definition.pixel_type
                || coverage.bands != definition.bands
            {
                return Err(RasterError::create_failed(format!(
                    "source layout does not match coverage {}",
                    definition.name
                )));
            }
            coverage
        }
        (true, None) => {
            return Err(RasterError::create_failed(format!(
                "coverage {} not found for append",
                definition.name
            )))
        }
        (false, Some(_)) => {
            return Err(RasterError::create_failed(format!(
                "coverage {} already exists (use APPEND_SUBDATASET=YES)",
                definition.name
            )))
        }
        (false, None) => {
            store.engine_mut().create_coverage(definition)?;
            definition.clone()
        }
    };

    let width = source.width();
    let height = source.height();
    let tile_width = coverage.tile_width;
    let tile_height = coverage.tile_height;
    let pixel_size = source.data_type().size_bytes() * coverage.bands as usize;

    let job = TileLoadJob {
        coverage: coverage.name.clone(),
        section: section_name.to_string(),
        width,
        height,
        extent,
        srid: coverage.srid,
    };

    let mut last_reported = -1.0f64;
    let mut fill = |tile: &TileRequest| -> RasterResult<Vec<u8>> {
        let mut buffer = vec![0u8; buffer_len(tile_width, tile_height, pixel_size)];
        if tile.offset_x < width && tile.offset_y < height {
            let copy_width = (width - tile.offset_x).min(tile_width);
            let copy_height = (height - tile.offset_y).min(tile_height);
            let mut window = vec![0u8; buffer_len(copy_width, copy_height, pixel_size)];
            source.read_window(
                tile.offset_x,
                tile.offset_y,
                copy_width,
                copy_height,
                &mut window,
            )?;
            let row_bytes = copy_width as usize * pixel_size;
            let stride = tile_width as usize * pixel_size;
            for row in 0..copy_height as usize {
                let src = row * row_bytes;
                buffer[row * stride..row * stride + row_bytes]
                    .copy_from_slice(&window[src..src + row_bytes]);
            }
        }

        let bottom = (tile.offset_y + tile_height).min(height);
        let fraction = bottom as f64 / height as f64;
        if fraction > last_reported {
            last_reported = fraction;
            if let Some(callback) = progress.as_deref_mut() {
                if !callback(fraction) {
                    return Err(RasterError::Cancelled);
                }
            }
        }
        Ok(buffer)
    };

    debug!(coverage = %coverage.name, section = %section_name, "streaming tiles");
    let section_id = store.engine_mut().ingest_section(&job, &mut fill)?;
    store
        .engine_mut()
        .build_pyramid(&coverage.name, Some(section_name), coverage.strict_resolution)?;
    Ok(section_id)
}

fn reopen(
    store: RasterStore,
    coverage: &str,
    section_id: i64,
    section_name: &str,
) -> RasterResult<RasterDataset> {
    let id = ConnectionId::coverage(store.path(), coverage);
    match open_subdataset(store, &id, &OpenOptions::default())? {
        OpenOutcome::Dataset(dataset) => Ok(*dataset),
        OpenOutcome::Sections { store, .. } => {
            let id = ConnectionId {
                path: store.path().to_string(),
                coverage: coverage.to_string(),
                section: Some(SectionRef {
                    id: section_id,
                    name: Some(section_name.to_string()),
                }),
            };
            match open_subdataset(store, &id, &OpenOptions::default())? {
                OpenOutcome::Dataset(dataset) => Ok(*dataset),
                OpenOutcome::Sections { .. } => Err(RasterError::open_failed(
                    "reopen after ingestion yielded a section listing",
                )),
            }
        }
    }
}

fn infer_pixel_type(
    source: &dyn SourceRaster,
    bands: u8,
    data_type: DataType,
) -> RasterResult<PixelType> {
    let byte_or_u16 = matches!(data_type, DataType::U8 | DataType::U16);
    if bands == 3 && byte_or_u16 {
        let rgb_order = source.color_interp(0) == ColorInterp::Red
            && source.color_interp(1) == ColorInterp::Green
            && source.color_interp(2) == ColorInterp::Blue;
        if rgb_order {
            return Ok(PixelType::Rgb);
        }
    }
    if bands > 1 && byte_or_u16 {
        return Ok(PixelType::Multiband);
    }
    if bands == 1 {
        return Ok(PixelType::DataGrid);
    }
    Err(RasterError::UnsupportedDataType(format!(
        "{:?} with {} bands",
        data_type, bands
    )))
}

fn validate_pixel_type(
    pixel_type: PixelType,
    bands: u8,
    data_type: DataType,
) -> RasterResult<()> {
    let byte_or_u16 = matches!(data_type, DataType::U8 | DataType::U16);
    let valid = match pixel_type {
        PixelType::Grayscale => bands == 1 && byte_or_u16,
        PixelType::DataGrid => bands == 1,
        PixelType::Rgb => bands == 3 && byte_or_u16,
        PixelType::Multiband => bands > 1 && byte_or_u16,
        PixelType::Monochrome | PixelType::Palette => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RasterError::create_failed(format!(
            "{:?} is incompatible with {} {:?} bands",
            pixel_type, bands, data_type
        )))
    }
}

/// Byte length of an interleaved pixel rectangle. Widens before multiplying
/// so caller-chosen block sizes cannot overflow the intermediate product.
fn buffer_len(width: u32, height: u32, pixel_size: usize) -> usize {
    width as usize * height as usize * pixel_size
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("raster")
        .to_string()
}
