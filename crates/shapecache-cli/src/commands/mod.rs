//! Command implementations and the setup they share

pub mod classify;
pub mod shape;

use shapecache_core::{
    types::{CharInfo, FeatureValues},
    CacheConfig, CacheError, CharMap, CutPolicy, FontCharMap, Result, StaticCharMap,
};

use crate::cli::TextArgs;

/// Character map from the font file, or a built-in Latin map
pub fn load_charmap(args: &TextArgs) -> Result<Box<dyn CharMap>> {
    match &args.font_file {
        Some(path) => {
            let map = FontCharMap::from_file(path, args.face_index)?;
            log::info!("Loaded {} mappings from {}", map.len(), path.display());
            Ok(Box::new(map))
        },
        None => Ok(Box::new(builtin_charmap())),
    }
}

/// ASCII, Latin-1, combining marks and the f-ligatures, each mapped to itself
fn builtin_charmap() -> StaticCharMap {
    let mut map = StaticCharMap::identity(0x20..0x7F);
    for (start, end) in [(0xA0, 0x100), (0x0300, 0x0370)] {
        for code_point in start..end {
            map.insert(code_point, code_point);
        }
    }
    for code_point in [0x200B, 0xFB01, 0xFB02] {
        map.insert(code_point, code_point);
    }
    map
}

/// The input characters with their cut flags applied
pub fn build_chars(args: &TextArgs, policy: &CutPolicy) -> Result<Vec<CharInfo>> {
    let mut chars: Vec<CharInfo> = args.text.chars().map(|c| CharInfo::new(c as u32)).collect();
    for (positions, flag) in [
        (&args.force, policy.force_flag),
        (&args.suppress, policy.suppress_flag),
    ] {
        for &index in positions {
            let info = chars.get_mut(index).ok_or_else(|| {
                CacheError::Config(format!(
                    "flag position {index} is past the end of a {}-character text",
                    args.text.chars().count()
                ))
            })?;
            info.flags = flag;
        }
    }
    Ok(chars)
}

/// Environment configuration, then command-line overrides
pub fn build_config(args: &TextArgs) -> CacheConfig {
    let mut config = CacheConfig::from_env();
    if args.min_cut_class.is_some() {
        config.policy.min_cut_class = args.min_cut_class;
    }
    config
}

/// Parse "tag=value" pairs separated by commas or spaces
pub fn parse_features(spec: Option<&str>) -> Result<FeatureValues> {
    let Some(spec) = spec else {
        return Ok(FeatureValues::default());
    };
    spec.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (tag, value) = match part.split_once('=') {
                Some((tag, value)) => (tag, value.parse::<u32>().ok()),
                None => (part, Some(1)),
            };
            match value {
                Some(value) if !tag.is_empty() => Ok((tag.to_string(), value)),
                _ => Err(CacheError::Config(format!("invalid feature setting {part:?}"))),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(FeatureValues::new)
}
