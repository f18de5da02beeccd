//! Block reads, caching, and 1-bit handling against the in-memory store.

use raster_common::{ConnectionId, Extent, PixelType, RasterError, SampleType};
use raster_dataset::{open_subdataset, OpenOptions, OpenOutcome, RasterDataset};
use test_utils::{coverage_definition, uniform_no_data, MemoryStore};

fn open_dataset(store: &MemoryStore, coverage: &str, options: &OpenOptions) -> RasterDataset {
    let id = ConnectionId::coverage("mem.db", coverage);
    match open_subdataset(store.raster_store(), &id, options).expect("open failed") {
        OpenOutcome::Dataset(dataset) => *dataset,
        OpenOutcome::Sections { .. } => panic!("expected a dataset"),
    }
}

fn gradient_pixels(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push(((x + y) % 256) as u8);
        }
    }
    pixels
}

#[test]
fn base_block_matches_stored_pixels() {
    let store = MemoryStore::new("mem.db");
    store.add_coverage(coverage_definition(
        "dem",
        SampleType::U8,
        PixelType::Grayscale,
        1,
        32,
        1.0,
        1.0,
    ));
    store.add_section(
        "dem",
        "only",
        Extent::new(0.0, 0.0, 64.0, 64.0),
        64,
        64,
        gradient_pixels(64, 64),
    );

    let mut dataset = open_dataset(&store, "dem", &OpenOptions::default());
    let block = dataset.read_block(0, 1, 1, 0).unwrap();
    assert_eq!(block.len(), 32 * 32);
    for y in 0..32u32 {
        for x in 0..32u32 {
            assert_eq!(
                block[(y * 32 + x) as usize],
                ((32 + x + y) % 256) as u8,
                "pixel ({}, {})",
                x,
                y
            );
        }
    }
}

#[test]
fn multiband_blocks_deinterleave_u16() {
    let store = MemoryStore::new("mem.db");
    store.add_coverage(coverage_definition(
        "pair",
        SampleType::U16,
        PixelType::Multiband,
        2,
        16,
        1.0,
        1.0,
    ));
    // Band 1 holds the pixel index, band 2 its complement.
    let mut pixels = Vec::new();
    for i in 0..(16 * 16) as u16 {
        pixels.extend_from_slice(&i.to_ne_bytes());
        pixels.extend_from_slice(&(u16::MAX - i).to_ne_bytes());
    }
    store.add_section(
        "pair",
        "only",
        Extent::new(0.0, 0.0, 16.0, 16.0),
        16,
        16,
        pixels,
    );

    let mut dataset = open_dataset(&store, "pair", &OpenOptions::default());
    let band1 = dataset.read_block(0, 1, 0, 0).unwrap();
    let band2 = dataset.read_block(0, 2, 0, 0).unwrap();
    assert_eq!(band1.len(), 16 * 16 * 2);
    let first = u16::from_ne_bytes([band1[0], band1[1]]);
    let last = u16::from_ne_bytes([band1[510], band1[511]]);
    assert_eq!(first, 0);
    assert_eq!(last, 255);
    assert_eq!(u16::from_ne_bytes([band2[0], band2[1]]), u16::MAX);
}

#[test]
fn sibling_bands_are_cached_by_one_fetch() {
    let store = MemoryStore::new("mem.db");
    store.add_coverage(coverage_definition(
        "rgb",
        SampleType::U8,
        PixelType::Rgb,
        3,
        16,
        1.0,
        1.0,
    ));
    let pixels: Vec<u8> = (0..16 * 16).flat_map(|_| [10u8, 20, 30]).collect();
    let section = store.add_section(
        "rgb",
        "only",
        Extent::new(0.0, 0.0, 16.0, 16.0),
        16,
        16,
        pixels,
    );

    let mut dataset = open_dataset(&store, "rgb", &OpenOptions::default());
    let red = dataset.read_block(0, 1, 0, 0).unwrap();
    assert!(red.iter().all(|&v| v == 10));

    // Rewrite storage; the sibling bands must still come from the cache.
    store.replace_section_pixels("rgb", section, vec![0u8; 16 * 16 * 3]);
    let green = dataset.read_block(0, 2, 0, 0).unwrap();
    let blue = dataset.read_block(0, 3, 0, 0).unwrap();
    assert!(green.iter().all(|&v| v == 20));
    assert!(blue.iter().all(|&v| v == 30));
}

#[test]
fn size_mismatch_aborts_but_cache_hits_survive() {
    let store = MemoryStore::new("mem.db");
    store.add_coverage(coverage_definition(
        "dem",
        SampleType::U8,
        PixelType::Grayscale,
        1,
        32,
        1.0,
        1.0,
    ));
    store.add_section(
        "dem",
        "only",
        Extent::new(0.0, 0.0, 64.0, 64.0),
        64,
        64,
        gradient_pixels(64, 64),
    );

    let mut dataset = open_dataset(&store, "dem", &OpenOptions::default());
    let first = dataset.read_block(0, 1, 0, 0).unwrap();

    store.set_read_shortfall(5);
    // Same block: served from cache, no storage round trip.
    assert_eq!(dataset.read_block(0, 1, 0, 0).unwrap(), first);
    // Different block: the short buffer is a hard failure.
    let err = dataset.read_block(0, 1, 1, 1).unwrap_err();
    assert!(matches!(
        err,
        RasterError::BlockSizeMismatch {
            expected: 1024,
            actual: 1019
        }
    ));
}

#[test]
fn uncovered_pixels_fill_with_no_data() {
    let store = MemoryStore::new("mem.db");
    let mut definition = coverage_definition(
        "patch",
        SampleType::U8,
        PixelType::Grayscale,
        1,
        32,
        1.0,
        1.0,
    );
    definition.no_data = Some(uniform_no_data(&definition, 7.0));
    store.add_coverage(definition);
    // Section covers only the left 20 columns of the 32-wide block.
    store.add_section(
        "patch",
        "only",
        Extent::new(0.0, 12.0, 20.0, 32.0),
        20,
        20,
        vec![100u8; 20 * 20],
    );

    let mut dataset = open_dataset(&store, "patch", &OpenOptions::default());
    assert_eq!(dataset.width(), 20);
    assert_eq!(dataset.height(), 20);
    let block = dataset.read_block(0, 1, 0, 0).unwrap();
    for y in 0..32u32 {
        for x in 0..32u32 {
            let value = block[(y * 32 + x) as usize];
            if x < 20 && y < 20 {
                assert_eq!(value, 100);
            } else {
                assert_eq!(value, 7);
            }
        }
    }
}

#[test]
fn mixed_overview_reads_stay_section_scoped() {
    let store = MemoryStore::new("mem.db");
    let mut definition = coverage_definition(
        "terrain",
        SampleType::U8,
        PixelType::Grayscale,
        1,
        32,
        1.0,
        1.0,
    );
    definition.mixed_resolutions = true;
    definition.strict_resolution = false;
    store.add_coverage(definition);
    // An overlapping sibling listed first; an unscoped fetch would hit it.
    store.add_section_with_resolution(
        "terrain",
        "coarse",
        Extent::new(0.0, 0.0, 256.0, 256.0),
        128,
        128,
        2.0,
        2.0,
        vec![50u8; 128 * 128],
    );
    let fine = store.add_section_with_resolution(
        "terrain",
        "fine",
        Extent::new(0.0, 0.0, 256.0, 256.0),
        256,
        256,
        1.0,
        1.0,
        vec![200u8; 256 * 256],
    );
    store.set_section_pyramid(
        "terrain",
        fine,
        vec![coverage_store::PyramidRow {
            resolutions: vec![(1.0, 1.0), (2.0, 2.0)],
        }],
    );

    let id = ConnectionId::section("mem.db", "terrain", fine, "fine");
    let mut dataset =
        match open_subdataset(store.raster_store(), &id, &OpenOptions::default()).expect("open failed") {
            OpenOutcome::Dataset(dataset) => *dataset,
            OpenOutcome::Sections { .. } => panic!("expected a dataset"),
        };
    assert_eq!(dataset.overview_count(), 1);

    let base = dataset.read_block(0, 1, 0, 0).unwrap();
    assert!(base.iter().all(|&v| v == 200));

    let overview = dataset.read_block(1, 1, 0, 0).unwrap();
    assert_eq!(overview.len(), 32 * 32);
    assert!(overview.iter().all(|&v| v == 200));
}

fn monochrome_store() -> MemoryStore {
    let store = MemoryStore::new("mem.db");
    store.add_coverage(coverage_definition(
        "scan",
        SampleType::U1,
        PixelType::Monochrome,
        1,
        64,
        1.0,
        1.0,
    ));
    // Vertical stripes, 8 pixels wide, of alternating 0/1.
    let mut bits = Vec::with_capacity(256 * 256);
    for y in 0..256u32 {
        for x in 0..256u32 {
            let _ = y;
            bits.push(((x / 8) % 2) as u8);
        }
    }
    store.add_section(
        "scan",
        "only",
        Extent::new(0.0, 0.0, 256.0, 256.0),
        256,
        256,
        bits,
    );
    store.set_pyramid(
        "scan",
        vec![coverage_store::PyramidRow {
            resolutions: vec![(1.0, 1.0), (2.0, 2.0)],
        }],
    );
    store
}

#[test]
fn promoted_monochrome_reads_full_range_bytes() {
    let store = monochrome_store();
    let mut dataset = open_dataset(&store, "scan", &OpenOptions::default());
    assert!(dataset.promoted_1bit());
    let band = dataset.band(1).unwrap();
    assert_eq!(band.bits(), 8);
    assert_eq!(
        band.metadata().get("SOURCE_NBITS").map(String::as_str),
        Some("1")
    );
    assert!(!band.metadata().contains_key("NBITS"));

    let block = dataset.read_block(0, 1, 0, 0).unwrap();
    assert!(block.iter().all(|&v| v == 0 || v == 255));
    assert!(block.contains(&255));
}

#[test]
fn unpromoted_monochrome_stays_strict_binary() {
    let store = monochrome_store();
    let options = OpenOptions {
        promote_1bit_to_8bit: false,
        ..OpenOptions::default()
    };
    let mut dataset = open_dataset(&store, "scan", &options);
    assert!(!dataset.promoted_1bit());
    let band = dataset.band(1).unwrap();
    assert_eq!(band.bits(), 1);
    assert_eq!(band.metadata().get("NBITS").map(String::as_str), Some("1"));

    // Base level: raw bits.
    let base = dataset.read_block(0, 1, 0, 0).unwrap();
    assert!(base.iter().all(|&v| v == 0 || v == 1));
    assert!(base.contains(&1));

    // Overview level: storage expands to 0/255, the reader re-collapses.
    assert_eq!(dataset.overview_count(), 1);
    let overview = dataset.read_block(1, 1, 0, 0).unwrap();
    assert!(overview.iter().all(|&v| v == 0 || v == 1));
    assert!(overview.contains(&1));
}

#[test]
fn color_table_rebuilt_per_level() {
    let store = MemoryStore::new("mem.db");
    let mut definition = coverage_definition(
        "land",
        SampleType::U8,
        PixelType::Palette,
        1,
        32,
        1.0,
        1.0,
    );
    definition.no_data = Some(uniform_no_data(&definition, 1.0));
    definition.palette = Some(coverage_store::Palette {
        entries: vec![
            coverage_store::PaletteEntry {
                red: 0,
                green: 128,
                blue: 0,
            },
            coverage_store::PaletteEntry {
                red: 0,
                green: 0,
                blue: 255,
            },
        ],
    });
    store.add_coverage(definition);
    store.add_section(
        "land",
        "only",
        Extent::new(0.0, 0.0, 256.0, 256.0),
        256,
        256,
        vec![0u8; 256 * 256],
    );
    store.set_pyramid(
        "land",
        vec![coverage_store::PyramidRow {
            resolutions: vec![(2.0, 2.0)],
        }],
    );

    let mut dataset = open_dataset(&store, "land", &OpenOptions::default());
    assert_eq!(dataset.overview_count(), 1);
    for level in 0..2 {
        let band = dataset.level_mut(level).unwrap().band_mut(1).unwrap();
        let table = band.color_table().expect("palette band has a table");
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.entries[1].alpha, 0);
        assert_eq!(table.entries[0].alpha, 255);
    }
}
