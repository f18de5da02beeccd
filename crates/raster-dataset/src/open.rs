//! Coverage resolution: probing a store and opening one dataset.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use coverage_store::{Coverage, CoverageEntry, PyramidRow, RasterStore};
use raster_common::{
    fmt_significant, ColorInterp, ConnectionId, DataType, Extent, GeoTransform, PixelType,
    RasterError, RasterResult, SampleType, SectionRef,
};

use crate::band::RasterBand;
use crate::cache::BlockCache;
use crate::dataset::{DatasetLevel, RasterDataset};
use crate::options::OpenOptions;
use crate::overview::build_chain;

/// One candidate in a sub-dataset listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdatasetEntry {
    /// Connection identifier string.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

/// Result of probing a store for raster content.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The store carries no loadable coverage.
    NotRaster,
    /// Exactly one coverage; open it directly with this identifier.
    Dataset(ConnectionId),
    /// Multiple coverages; the caller must pick one.
    Subdatasets(Vec<SubdatasetEntry>),
}

/// Result of resolving one connection identifier.
pub enum OpenOutcome {
    Dataset(Box<RasterDataset>),
    /// The coverage has multiple sections and none was selected; the store
    /// handle is returned for a follow-up open with an explicit section.
    Sections {
        store: RasterStore,
        sections: Vec<SubdatasetEntry>,
    },
}

/// Probe a store for raster coverages.
///
/// A store with exactly one loadable coverage resolves directly instead of
/// leaving selection to the caller.
pub fn probe_store(store: &RasterStore) -> RasterResult<ProbeOutcome> {
    let coverages = store.registry().list_coverages()?;
    match coverages.len() {
        0 => Ok(ProbeOutcome::NotRaster),
        1 => Ok(ProbeOutcome::Dataset(ConnectionId::coverage(
            store.path(),
            &coverages[0].name,
        ))),
        _ => {
            let entries = coverages
                .iter()
                .map(|entry| SubdatasetEntry {
                    name: ConnectionId::coverage(store.path(), &entry.name).to_string(),
                    description: describe_coverage(entry),
                })
                .collect();
            Ok(ProbeOutcome::Subdatasets(entries))
        }
    }
}

fn describe_coverage(entry: &CoverageEntry) -> String {
    let mut description = entry.name.clone();
    if let Some(title) = entry.real_title() {
        description.push_str(" - ");
        description.push_str(title);
    }
    if let Some(abstract_) = entry.real_abstract() {
        description.push_str(" (");
        description.push_str(abstract_);
        description.push(')');
    }
    description
}

/// Format a listing as (`SUBDATASET_<n>_NAME`, `SUBDATASET_<n>_DESC`) pairs.
///
/// Exposed only when more than one candidate exists; fewer yield no pairs.
pub fn subdataset_metadata(entries: &[SubdatasetEntry]) -> Vec<(String, String)> {
    if entries.len() < 2 {
        return Vec::new();
    }
    entries
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| {
            [
                (format!("SUBDATASET_{}_NAME", i + 1), entry.name.clone()),
                (
                    format!("SUBDATASET_{}_DESC", i + 1),
                    entry.description.clone(),
                ),
            ]
        })
        .collect()
}

/// Resolve one connection identifier into an opened dataset.
///
/// Without a section selector, a multi-section coverage yields a section
/// listing instead of a dataset; a single section is selected automatically.
pub fn open_subdataset(
    store: RasterStore,
    id: &ConnectionId,
    options: &OpenOptions,
) -> RasterResult<OpenOutcome> {
    let coverage = store
        .engine()
        .coverage(&id.coverage)?
        .ok_or_else(|| RasterError::CoverageNotFound(id.coverage.clone()))?;
    let entry = store.registry().coverage_entry(&id.coverage)?;

    let (section_id, section_name, single_section) = match &id.section {
        Some(section) => (Some(section.id), section.name.clone(), false),
        None => {
            let sections = store.registry().sections(&id.coverage)?;
            match sections.len() {
                0 => (None, None, false),
                1 => (Some(sections[0].id), Some(sections[0].name.clone()), true),
                _ => {
                    let listing = sections
                        .iter()
                        .map(|section| SubdatasetEntry {
                            name: ConnectionId::section(
                                store.path(),
                                &id.coverage,
                                section.id,
                                &section.name,
                            )
                            .to_string(),
                            description: format!(
                                "Section {} of coverage {}",
                                section.name, id.coverage
                            ),
                        })
                        .collect();
                    return Ok(OpenOutcome::Sections {
                        store,
                        sections: listing,
                    });
                }
            }
        }
    };

    let (extent, x_res, y_res) = match section_id {
        Some(section) => {
            let geometry = store
                .engine()
                .section_geometry(&id.coverage, section)?
                .ok_or_else(|| RasterError::SectionNotFound {
                    coverage: id.coverage.clone(),
                    section,
                })?;
            (geometry.extent, geometry.x_res, geometry.y_res)
        }
        None => {
            let extent = store
                .registry()
                .coverage_extent(&id.coverage)?
                .ok_or_else(|| {
                    RasterError::open_failed(format!(
                        "coverage {} has no registered extent",
                        id.coverage
                    ))
                })?;
            (extent, coverage.x_res, coverage.y_res)
        }
    };

    let width = derive_dimension(extent.width(), x_res, "width")?;
    let height = derive_dimension(extent.height(), y_res, "height")?;
    let geo = GeoTransform::from_extent(&extent, width, height);

    let srs_wkt = match store.registry().srs_wkt(coverage.srid)? {
        Some(wkt) if wkt_uses_inverted_axes(&wkt) => Some(remove_axis_nodes(&wkt)),
        other => other,
    };

    let promoted = coverage.sample_type == SampleType::U1
        && coverage.pixel_type == PixelType::Monochrome
        && options.promote_1bit_to_8bit;
    let stats_eligible = section_id.is_none() || single_section;

    let no_data_values = resolve_no_data(&coverage);
    let metadata = dataset_metadata(
        &store,
        &coverage,
        entry.as_ref(),
        section_id,
        &no_data_values,
    )?;
    let image_structure = image_structure_metadata(&coverage);

    let statistics = if stats_eligible && !promoted {
        store.engine().coverage_statistics(&id.coverage)?
    } else {
        None
    };

    let format = coverage.sample_type.format();
    let mut bands = Vec::with_capacity(coverage.bands as usize);
    for index in 1..=coverage.bands {
        let mut band_metadata = BTreeMap::new();
        if promoted {
            band_metadata.insert("SOURCE_NBITS".to_string(), "1".to_string());
        } else if format.bits < 8 {
            band_metadata.insert("NBITS".to_string(), format.bits.to_string());
        }
        if format.signed && format.data_type == DataType::U8 && format.bits == 8 {
            band_metadata.insert("PIXELTYPE".to_string(), "SIGNEDBYTE".to_string());
        }
        if let Some(per_band) = statistics
            .as_ref()
            .and_then(|stats| stats.get(index as usize - 1))
        {
            band_metadata.insert(
                "STATISTICS_MINIMUM".to_string(),
                fmt_significant(per_band.min, 16),
            );
            band_metadata.insert(
                "STATISTICS_MAXIMUM".to_string(),
                fmt_significant(per_band.max, 16),
            );
            band_metadata.insert(
                "STATISTICS_MEAN".to_string(),
                fmt_significant(per_band.mean, 16),
            );
            band_metadata.insert(
                "STATISTICS_STDDEV".to_string(),
                fmt_significant(per_band.stddev, 16),
            );
        }
        let no_data = if coverage.bands == 1 {
            no_data_values.as_ref().map(|values| values[0])
        } else {
            None
        };
        bands.push(RasterBand::new(
            index,
            format.data_type,
            if promoted { 8 } else { format.bits },
            format.signed,
            coverage.tile_width,
            coverage.tile_height,
            ColorInterp::for_band(coverage.pixel_type, index as usize - 1),
            no_data,
            band_metadata,
            coverage.palette.clone(),
        ));
    }

    let rows = pyramid_rows_for(&store, &coverage, section_id)?;
    let mut chain = build_chain(&rows, x_res, &extent, options.show_all_pyramid_levels);
    if chain.is_empty() {
        // Externally-installed overviews, only when storage yields none.
        let persisted = store.registry().persisted_overviews(&id.coverage)?;
        if !persisted.is_empty() {
            let fallback = vec![PyramidRow {
                resolutions: persisted,
            }];
            chain = build_chain(&fallback, x_res, &extent, options.show_all_pyramid_levels);
        }
    }

    let mut levels = Vec::with_capacity(1 + chain.len());
    for spec in &chain {
        let overview_geo = GeoTransform {
            origin_x: geo.origin_x,
            pixel_width: spec.x_res,
            origin_y: geo.origin_y,
            pixel_height: -spec.y_res,
        };
        levels.push(DatasetLevel {
            width: spec.width,
            height: spec.height,
            x_res: spec.x_res,
            y_res: spec.y_res,
            geo: overview_geo,
            bands: bands.iter().map(RasterBand::derive_for_overview).collect(),
            cache: BlockCache::new(options.cache_bytes),
        });
    }
    levels.insert(
        0,
        DatasetLevel {
            width,
            height,
            x_res,
            y_res,
            geo,
            bands,
            cache: BlockCache::new(options.cache_bytes),
        },
    );

    let connection = match (&id.section, section_id) {
        (None, Some(section)) => ConnectionId {
            path: id.path.clone(),
            coverage: id.coverage.clone(),
            section: Some(SectionRef {
                id: section,
                name: section_name,
            }),
        },
        _ => id.clone(),
    };

    debug!(
        connection = %connection,
        width,
        height,
        overviews = levels.len() - 1,
        "opened dataset"
    );

    Ok(OpenOutcome::Dataset(Box::new(RasterDataset {
        store,
        coverage,
        connection,
        section_id,
        single_section,
        promoted_1bit: promoted,
        srs_wkt,
        metadata,
        image_structure,
        levels,
    })))
}

fn pyramid_rows_for(
    store: &RasterStore,
    coverage: &Coverage,
    section_id: Option<i64>,
) -> RasterResult<Vec<PyramidRow>> {
    if coverage.mixed_resolutions {
        // Without a section there is no single resolution ladder to expose.
        match section_id {
            Some(section) => store
                .registry()
                .section_pyramid_rows(&coverage.name, section),
            None => Ok(Vec::new()),
        }
    } else {
        store.registry().pyramid_rows(&coverage.name)
    }
}

fn dataset_metadata(
    store: &RasterStore,
    coverage: &Coverage,
    entry: Option<&CoverageEntry>,
    section_id: Option<i64>,
    no_data_values: &Option<Vec<f64>>,
) -> RasterResult<BTreeMap<String, String>> {
    let mut metadata = BTreeMap::new();
    if let Some(entry) = entry {
        if let Some(title) = entry.real_title() {
            metadata.insert("COVERAGE_TITLE".to_string(), title.to_string());
        }
        if let Some(abstract_) = entry.real_abstract() {
            metadata.insert("COVERAGE_ABSTRACT".to_string(), abstract_.to_string());
        }
    }
    if let Some(section) = section_id {
        if coverage.section_summaries {
            if let Some(summary) = store.registry().section_summary(&coverage.name, section)? {
                metadata.insert("SECTION_SUMMARY".to_string(), summary);
            }
        }
    }
    if coverage.bands > 1 {
        if let Some(values) = no_data_values {
            let joined = values
                .iter()
                .map(|v| fmt_significant(*v, 6))
                .collect::<Vec<_>>()
                .join(" ");
            metadata.insert("NODATA_VALUES".to_string(), joined);
        }
    }
    Ok(metadata)
}

fn image_structure_metadata(coverage: &Coverage) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if let Some(name) = coverage.compression.display_name() {
        metadata.insert("COMPRESSION".to_string(), name.to_string());
    }
    if coverage.compression.is_lossy() && coverage.quality != 0 {
        metadata.insert("QUALITY".to_string(), coverage.quality.to_string());
    }
    metadata
}

/// Resolve the coverage's stored no-data pixel into per-band scalars.
///
/// Honored only when the pixel's sample type, pixel type and band count all
/// match the coverage's own; any mismatch silently disables no-data.
fn resolve_no_data(coverage: &Coverage) -> Option<Vec<f64>> {
    let pixel = coverage.no_data.as_ref()?;
    if pixel.sample_type() != coverage.sample_type
        || pixel.pixel_type() != coverage.pixel_type
        || pixel.bands() != coverage.bands
    {
        warn!(
            coverage = %coverage.name,
            "ignoring stored no-data pixel with mismatched shape"
        );
        return None;
    }
    (0..coverage.bands as usize)
        .map(|band| pixel.value_as_f64(band))
        .collect()
}

/// Derive a raster dimension from a world span and resolution.
fn derive_dimension(span: f64, res: f64, axis: &str) -> RasterResult<u32> {
    if res <= 0.0 {
        return Err(RasterError::invalid_geometry(format!(
            "non-positive {} resolution: {}",
            axis, res
        )));
    }
    let cells = span / res + 0.5;
    if cells > i32::MAX as f64 {
        return Err(RasterError::invalid_geometry(format!(
            "{} of {} exceeds the 32-bit range",
            axis, cells
        )));
    }
    let dim = cells as i64;
    if dim < 1 {
        return Err(RasterError::invalid_geometry(format!(
            "degenerate {}: {} cells",
            axis, cells
        )));
    }
    Ok(dim as u32)
}

fn wkt_uses_inverted_axes(wkt: &str) -> bool {
    let lower = wkt.to_ascii_lowercase();
    lower.contains("axis[\"latitude\"") || lower.contains("axis[\"northing\"")
}

/// Remove every `AXIS[...]` node (with its leading comma) from a WKT string.
fn remove_axis_nodes(wkt: &str) -> String {
    let mut out = String::with_capacity(wkt.len());
    let mut rest = wkt;
    while !rest.is_empty() {
        let at_axis = rest
            .get(..6)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(",AXIS["));
        if at_axis {
            let mut depth = 0usize;
            let mut end = None;
            for (offset, c) in rest.char_indices() {
                match c {
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(offset + 1);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(end) = end {
                rest = &rest[end..];
                continue;
            }
        }
        let c = rest.chars().next().unwrap_or_default();
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}
