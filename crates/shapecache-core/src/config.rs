//! Cache configuration
//!
//! A [`CacheConfig`] is handed to the cache store once, at construction, and
//! stays fixed for the store's lifetime. Defaults can be overridden from the
//! environment:
//!
//! ```bash
//! SHAPECACHE_DISABLE=1 ./my_app      # shape everything uncached
//! SHAPECACHE_SIZE=4000 ./my_app      # entries per (script, features) bucket
//! ```
//!
//! [`CutPolicy`] holds the boundary rules the segmentation driver uses to
//! decide where a run may be cut into independently cached sub-runs.

use serde::Serialize;

use crate::types::CharInfo;

/// Default number of entries per (script, features) cache bucket
pub const DEFAULT_MAX_SEGMENTS: usize = 1000;

const ENV_DISABLE: &str = "SHAPECACHE_DISABLE";
const ENV_SIZE: &str = "SHAPECACHE_SIZE";

/// Where a character may end a cacheable sub-run
///
/// The defaults follow the engine's shaping convention: flag 2 forces a cut,
/// flag 1 forbids one, and otherwise a space or zero width space ends a
/// sub-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutPolicy {
    pub force_flag: u8,
    pub suppress_flag: u8,
    pub break_chars: Vec<u32>,
    /// When set, unflagged characters whose boundary class is at least this
    /// value also cut
    pub min_cut_class: Option<u8>,
}

impl Default for CutPolicy {
    fn default() -> Self {
        Self {
            force_flag: 2,
            suppress_flag: 1,
            break_chars: vec![0x0020, 0x200B],
            min_cut_class: None,
        }
    }
}

/// Why a character does or does not end a sub-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutDecision {
    Forced,
    Suppressed,
    BreakChar,
    CutClass,
    NoCut,
}

impl CutDecision {
    pub fn is_cut(self) -> bool {
        matches!(self, Self::Forced | Self::BreakChar | Self::CutClass)
    }
}

impl CutPolicy {
    /// Classify one character; `cut_class` is its boundary class (0-3)
    pub fn decide(&self, info: CharInfo, cut_class: u8) -> CutDecision {
        if info.flags == self.force_flag {
            return CutDecision::Forced;
        }
        if info.flags == self.suppress_flag {
            return CutDecision::Suppressed;
        }
        if self.break_chars.contains(&info.code_point) {
            return CutDecision::BreakChar;
        }
        match self.min_cut_class {
            Some(min) if min > 0 && cut_class >= min => CutDecision::CutClass,
            _ => CutDecision::NoCut,
        }
    }

    /// Whether the boundary class table is consulted at all
    pub fn uses_cut_classes(&self) -> bool {
        self.min_cut_class.is_some()
    }
}

/// How the cache store is set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every run takes the uncached path
    pub enabled: bool,
    /// Maximum entries per (script, features) bucket
    pub max_segments: usize,
    pub policy: CutPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_segments: DEFAULT_MAX_SEGMENTS,
            policy: CutPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Defaults, then `SHAPECACHE_DISABLE` and `SHAPECACHE_SIZE` overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_DISABLE) {
            if matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on") {
                self.enabled = false;
                log::info!("Shape caching disabled via {ENV_DISABLE}");
            }
        }

        if let Some(val) = lookup(ENV_SIZE) {
            match val.trim().parse::<usize>() {
                Ok(size) if size > 0 => {
                    self.max_segments = size;
                    log::info!("Shape cache bucket size set to {size} via {ENV_SIZE}");
                },
                _ => log::warn!("Ignoring invalid {ENV_SIZE} value {val:?}"),
            }
        }

        self
    }

    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }

    pub fn with_policy(mut self, policy: CutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
