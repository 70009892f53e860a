//! Shape command implementation

use serde::Serialize;
use shapecache::{CacheStore, SegmentStats, TableStats};
use std::error::Error;

use shapecache_core::{types::ShapedGlyph, ArenaRun, CacheError, ShapingEngine};
use shapecache_shape_basic::BasicEngine;

use super::{build_chars, build_config, load_charmap, parse_features};
use crate::cli::ShapeArgs;

#[derive(Serialize)]
struct Report<'a> {
    text: &'a str,
    engine: &'static str,
    glyphs: Vec<ShapedGlyph>,
    segments: SegmentStats,
    tables: Vec<TableStats>,
}

pub fn run(args: &ShapeArgs) -> Result<(), Box<dyn Error>> {
    if args.repeat == 0 {
        return Err(CacheError::Config("--repeat must be at least 1".into()).into());
    }

    let mut config = build_config(&args.input);
    if let Some(size) = args.size {
        config = config.with_max_segments(size);
    }
    if args.no_cache {
        config = config.with_enabled(false);
    }

    let charmap = load_charmap(&args.input)?;
    let engine = BasicEngine::new(charmap.as_ref());
    let features = parse_features(args.features.as_deref())?;
    let chars = build_chars(&args.input, &config.policy)?;
    let mut store = CacheStore::new(config, charmap.as_ref(), &[&engine])?;

    let mut totals = SegmentStats::default();
    let mut glyphs = Vec::new();
    for _ in 0..args.repeat {
        let mut run = ArenaRun::new(chars.clone(), charmap.as_ref(), 1);
        let stats = store.shape(0, &features, &engine, &mut run)?;
        totals.merge(&stats);
        run.finalise();
        glyphs = run.shaped_glyphs();
    }

    let report = Report {
        text: &args.input.text,
        engine: engine.name(),
        glyphs,
        segments: totals,
        tables: store.stats(),
    };

    if args.input.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &Report<'_>) {
    println!("Shaped {:?} with {}", report.text, report.engine);
    println!();
    println!(
        "{:>4}  {:>6}  {:>8}  {:>8}  {:>7}  {:>4}  parent",
        "#", "glyph", "x", "y", "advance", "char"
    );
    for (i, glyph) in report.glyphs.iter().enumerate() {
        let parent = glyph
            .attached_to
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:>4}  {:>6}  {:>8.1}  {:>8.1}  {:>7.1}  {:>4}  {}",
            i, glyph.glyph, glyph.x, glyph.y, glyph.advance, glyph.original, parent
        );
    }

    let s = &report.segments;
    println!();
    println!(
        "Segments: {} ({} hits, {} misses, {} not cached), uncached runs: {}",
        s.segments, s.hits, s.misses, s.cache_failures, s.uncached
    );
    for (script, table) in report.tables.iter().enumerate() {
        println!(
            "Script {}: {}/{} entries, {} evictions, hit rate {:.1}%",
            script,
            table.live,
            table.full_threshold,
            table.evictions,
            table.hit_rate() * 100.0
        );
    }
}
