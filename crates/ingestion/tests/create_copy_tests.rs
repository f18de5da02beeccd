//! End-to-end ingestion through the in-memory store.

use ingestion::{create_copy, CreateOptions};
use raster_common::{Compression, PixelType, RasterError};
use test_utils::{MemoryRaster, MemoryStore};

fn grayscale_options(block: u32) -> CreateOptions {
    CreateOptions {
        coverage: Some("cov".to_string()),
        section: Some("main".to_string()),
        pixel_type: Some(PixelType::Grayscale),
        block_width: block,
        block_height: block,
        ..CreateOptions::default()
    }
}

#[test]
fn grayscale_round_trip_is_lossless() {
    let store = MemoryStore::new("copy.db");
    let source = MemoryRaster::gradient_u8(1000, 1000);

    let mut dataset = create_copy(
        store.raster_store(),
        &source,
        &grayscale_options(256),
        None,
    )
    .unwrap();

    assert_eq!(dataset.width(), 1000);
    assert_eq!(dataset.height(), 1000);
    assert_eq!(dataset.band_count(), 1);
    assert_eq!(dataset.band(1).unwrap().block_size(), (256, 256));

    for block_y in 0..4u32 {
        for block_x in 0..4u32 {
            let block = dataset.read_block(0, 1, block_x, block_y).unwrap();
            for y in 0..256u32 {
                for x in 0..256u32 {
                    let px = block_x * 256 + x;
                    let py = block_y * 256 + y;
                    if px >= 1000 || py >= 1000 {
                        continue;
                    }
                    assert_eq!(
                        block[(y * 256 + x) as usize],
                        source.value_u8(px, py, 0),
                        "pixel ({}, {})",
                        px,
                        py
                    );
                }
            }
        }
    }
}

#[test]
fn u16_zero_pixels_read_back_as_no_data() {
    let store = MemoryStore::new("copy.db");
    let source = MemoryRaster::sparse_u16(64, 64);

    let mut dataset = create_copy(
        store.raster_store(),
        &source,
        &CreateOptions {
            coverage: Some("grid".to_string()),
            block_width: 64,
            block_height: 64,
            ..CreateOptions::default()
        },
        None,
    )
    .unwrap();

    // Single band infers a data grid; its default no-data is zero.
    assert_eq!(dataset.coverage().pixel_type, PixelType::DataGrid);
    let no_data = dataset.band(1).unwrap().no_data().unwrap();
    assert_eq!(no_data, 0.0);

    let block = dataset.read_block(0, 1, 0, 0).unwrap();
    for y in 0..64u32 {
        for x in 0..64u32 {
            let offset = ((y * 64 + x) * 2) as usize;
            let value = u16::from_ne_bytes([block[offset], block[offset + 1]]);
            if (x + y) % 13 == 0 {
                assert_eq!(value as f64, no_data, "pixel ({}, {})", x, y);
            } else {
                assert_eq!(value, source.value_u16(x, y, 0));
            }
        }
    }
}

#[test]
fn edge_tiles_are_zero_padded_and_progress_reaches_one_once() {
    let store = MemoryStore::new("copy.db");
    // 100x75 is not a multiple of the 32-pixel tile.
    let source = MemoryRaster::gradient_u8(100, 75);

    let mut reported: Vec<f64> = Vec::new();
    let mut progress = |fraction: f64| -> bool {
        reported.push(fraction);
        true
    };
    let dataset = create_copy(
        store.raster_store(),
        &source,
        &grayscale_options(32),
        Some(&mut progress),
    )
    .unwrap();
    assert_eq!(dataset.width(), 100);
    assert_eq!(dataset.height(), 75);

    assert!(reported.windows(2).all(|w| w[0] < w[1]), "monotonic progress");
    assert_eq!(reported.iter().filter(|&&f| f == 1.0).count(), 1);
    assert_eq!(*reported.last().unwrap(), 1.0);

    // The stored mosaic holds the source values, with no stray bytes from
    // past-the-edge tile regions.
    let data = store.coverage_data("cov").unwrap();
    let section = &data.sections[0];
    assert_eq!((section.width, section.height), (100, 75));
    for y in 0..75u32 {
        for x in 0..100u32 {
            assert_eq!(
                section.pixels[(y * 100 + x) as usize],
                source.value_u8(x, y, 0)
            );
        }
    }
}

#[test]
fn rotated_geotransform_fails_before_any_mutation() {
    let store = MemoryStore::new("copy.db");
    let source =
        MemoryRaster::gradient_u8(64, 64).with_geo_transform([0.0, 1.0, 0.1, 64.0, 0.0, -1.0]);

    let err = create_copy(
        store.raster_store(),
        &source,
        &grayscale_options(32),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::RotatedGeoTransform));
    assert_eq!(store.coverage_count(), 0);
}

#[test]
fn cancellation_rolls_the_transaction_back() {
    let store = MemoryStore::new("copy.db");
    let source = MemoryRaster::gradient_u8(128, 128);

    let mut progress = |_fraction: f64| -> bool { false };
    let err = create_copy(
        store.raster_store(),
        &source,
        &grayscale_options(32),
        Some(&mut progress),
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::Cancelled));
    assert_eq!(store.coverage_count(), 0);
}

#[test]
fn append_requires_coverage_name() {
    let store = MemoryStore::new("copy.db");
    let source = MemoryRaster::gradient_u8(16, 16);
    let options = CreateOptions {
        append: true,
        ..CreateOptions::default()
    };
    let err = create_copy(store.raster_store(), &source, &options, None).unwrap_err();
    assert!(matches!(
        err,
        RasterError::MissingOption {
            option: "COVERAGE",
            ..
        }
    ));
}

#[test]
fn append_adds_a_second_section() {
    let store = MemoryStore::new("copy.db");
    let first = MemoryRaster::gradient_u8(64, 64);
    create_copy(store.raster_store(), &first, &grayscale_options(32), None).unwrap();

    let second = MemoryRaster::gradient_u8(64, 64)
        .with_geo_transform([64.0, 1.0, 0.0, 64.0, 0.0, -1.0]);
    let options = CreateOptions {
        append: true,
        section: Some("east".to_string()),
        ..grayscale_options(32)
    };
    let dataset = create_copy(store.raster_store(), &second, &options, None).unwrap();

    let data = store.coverage_data("cov").unwrap();
    assert_eq!(data.sections.len(), 2);
    assert_eq!(data.sections[1].name, "east");
    // Reopen resolved the freshly ingested section.
    assert_eq!(dataset.section_id(), Some(data.sections[1].id));
}

#[test]
fn rgb_is_inferred_from_band_order() {
    let store = MemoryStore::new("copy.db");
    let source = MemoryRaster::rgb_u8(64, 64);
    let options = CreateOptions {
        coverage: Some("ortho".to_string()),
        block_width: 64,
        block_height: 64,
        compression: Compression::LossyWebp,
        quality: Some(100),
        ..CreateOptions::default()
    };
    let dataset = create_copy(store.raster_store(), &source, &options, None).unwrap();

    let coverage = dataset.coverage();
    assert_eq!(coverage.pixel_type, PixelType::Rgb);
    // Explicit quality 100 upgrades lossy WEBP to the lossless variant.
    assert_eq!(coverage.compression, Compression::LosslessWebp);
    assert_eq!(
        dataset
            .image_structure_metadata()
            .get("COMPRESSION")
            .map(String::as_str),
        Some("WEBP_LOSSLESS")
    );
}

#[test]
fn srid_falls_back_to_the_source() {
    let store = MemoryStore::new("copy.db");
    store.add_srid(3857, r#"PROJCS["WGS 84 / Pseudo-Mercator"]"#);
    let source = MemoryRaster::gradient_u8(64, 64).with_srid(3857);

    let dataset = create_copy(
        store.raster_store(),
        &source,
        &grayscale_options(32),
        None,
    )
    .unwrap();
    assert_eq!(dataset.coverage().srid, 3857);
    assert!(dataset.srs_wkt().unwrap().contains("Pseudo-Mercator"));
}

#[test]
fn default_names_come_from_the_store_path() {
    let store = MemoryStore::new("/tmp/alps.db");
    let source = MemoryRaster::gradient_u8(32, 32);
    let dataset = create_copy(
        store.raster_store(),
        &source,
        &CreateOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(dataset.coverage().name, "alps");
    let data = store.coverage_data("alps").unwrap();
    assert_eq!(data.sections[0].name, "alps");
}
