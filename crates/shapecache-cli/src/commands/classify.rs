//! Classify command implementation

use std::error::Error;

use serde::Serialize;
use shapecache::{CacheStore, Segmenter};
use shapecache_core::{CacheError, CutDecision};
use shapecache_shape_basic::BasicEngine;

use super::{build_chars, build_config, load_charmap};
use crate::cli::ClassifyArgs;

#[derive(Serialize)]
struct CharReport {
    index: usize,
    code_point: String,
    flags: u8,
    cut_class: u8,
    decision: CutDecision,
    cut: bool,
}

pub fn run(args: &ClassifyArgs) -> Result<(), Box<dyn Error>> {
    let config = build_config(&args.input);
    let charmap = load_charmap(&args.input)?;
    let engine = BasicEngine::new(charmap.as_ref());
    let chars = build_chars(&args.input, &config.policy)?;
    let store = CacheStore::new(config, charmap.as_ref(), &[&engine])?;

    let Some(script) = store.script(0) else {
        return Err(CacheError::ScriptOutOfRange { index: 0, count: 0 }.into());
    };
    let segmenter = Segmenter::new(&store.config().policy).with_cut_table(script.cut_table());

    let last = chars.len().saturating_sub(1);
    let report: Vec<CharReport> = chars
        .iter()
        .enumerate()
        .map(|(index, info)| {
            let decision = segmenter.decide(*info);
            CharReport {
                index,
                code_point: format!("U+{:04X}", info.code_point),
                flags: info.flags,
                cut_class: store.boundary_class(info.code_point, 0),
                decision,
                // the last character always ends a sub-run
                cut: index == last || decision.is_cut(),
            }
        })
        .collect();

    if args.input.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{:>4}  {:>8}  {:>5}  {:>5}  decision", "#", "char", "flags", "class");
    for row in &report {
        println!(
            "{:>4}  {:>8}  {:>5}  {:>5}  {:?}{}",
            row.index,
            row.code_point,
            row.flags,
            row.cut_class,
            row.decision,
            if row.cut { "  |" } else { "" }
        );
    }
    Ok(())
}
