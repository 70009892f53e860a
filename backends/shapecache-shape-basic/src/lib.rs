//! Basic Engine - a small, deterministic set of shaping passes
//!
//! Three passes, run in order:
//!
//! 0. Substitution: `f` + `i` and `f` + `l` become their ligatures
//! 1. Positioning: advances from a fixed width table, combining marks
//!    attached to the preceding base
//! 2. Kerning: a handful of classic Latin pairs
//!
//! Every rule is local to adjacent glyphs and never reaches across
//! whitespace, so a run cut after spaces shapes exactly like the whole run.

use std::collections::HashMap;

use shapecache_core::{
    error::{RunError, ShapingError},
    types::{GlyphId, NodeId, Point},
    CharMap, GlyphRun, ShapingEngine,
};

const PASS_SUBSTITUTE: usize = 0;
const PASS_POSITION: usize = 1;
const PASS_KERN: usize = 2;
const PASS_COUNT: usize = 3;

/// Height of the first mark above its base; each stacked mark goes higher
const MARK_RISE: f32 = 650.0;
const MARK_STACK: f32 = 150.0;

const LIGATURES: [(char, char, char); 2] = [('f', 'i', '\u{FB01}'), ('f', 'l', '\u{FB02}')];

const KERNING: [(char, char, f32); 5] = [
    ('A', 'V', -80.0),
    ('V', 'A', -80.0),
    ('A', 'W', -50.0),
    ('T', 'o', -60.0),
    ('L', 'T', -70.0),
];

fn is_mark(code_point: u32) -> bool {
    matches!(code_point, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x20D0..=0x20FF)
}

fn is_space(code_point: u32) -> bool {
    matches!(code_point, 0x0020 | 0x00A0 | 0x200B | 0x3000)
}

/// Advance width in font units
fn advance_for(code_point: Option<u32>) -> f32 {
    match code_point {
        Some(0x0020) | Some(0x00A0) => 250.0,
        Some(0x200B) => 0.0,
        Some(0x3000) => 1000.0,
        Some(cp) if is_mark(cp) => 0.0,
        Some(cp) => 400.0 + (cp % 5) as f32 * 50.0,
        None => 500.0,
    }
}

fn glyph_of(run: &dyn GlyphRun, id: NodeId) -> Result<GlyphId, ShapingError> {
    run.node(id)
        .map(|n| n.glyph)
        .ok_or_else(|| RunError::InvalidNode(id).into())
}

/// Nodes of the active scope, in order
fn scoped_nodes(run: &dyn GlyphRun) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut cursor = run.first_node();
    while let Some(id) = cursor {
        ids.push(id);
        cursor = run.next_node(id);
    }
    ids
}

/// A shaping engine whose rules are resolved against one font's character map
#[derive(Debug, Clone)]
pub struct BasicEngine {
    code_points: HashMap<GlyphId, u32>,
    ligatures: HashMap<(GlyphId, GlyphId), GlyphId>,
    kerning: HashMap<(GlyphId, GlyphId), f32>,
}

impl BasicEngine {
    /// Resolve every rule whose glyphs the character map provides
    pub fn new(charmap: &dyn CharMap) -> Self {
        let mut code_points = HashMap::new();
        for (code_point, glyph) in charmap.mappings() {
            code_points.entry(glyph).or_insert(code_point);
        }

        let glyph = |c: char| charmap.map(c as u32);
        let ligatures: HashMap<_, _> = LIGATURES
            .iter()
            .filter_map(|&(a, b, lig)| Some(((glyph(a)?, glyph(b)?), glyph(lig)?)))
            .collect();
        let kerning: HashMap<_, _> = KERNING
            .iter()
            .filter_map(|&(a, b, value)| Some(((glyph(a)?, glyph(b)?), value)))
            .collect();

        log::debug!(
            "BasicEngine: {} ligatures, {} kerning pairs",
            ligatures.len(),
            kerning.len()
        );
        Self {
            code_points,
            ligatures,
            kerning,
        }
    }

    fn code_point(&self, glyph: GlyphId) -> Option<u32> {
        self.code_points.get(&glyph).copied()
    }

    fn substitute(&self, run: &mut dyn GlyphRun) -> Result<(), ShapingError> {
        let mut cursor = run.first_node();
        while let Some(id) = cursor {
            let glyph = glyph_of(run, id)?;
            let ligature = match run.next_node(id) {
                Some(next) => self
                    .ligatures
                    .get(&(glyph, glyph_of(run, next)?))
                    .map(|&lig| (next, lig)),
                None => None,
            };

            let components = match ligature {
                Some((next, lig)) => {
                    let after = run.node(next).map(|n| n.after);
                    run.remove(next)?;
                    let node = run.node_mut(id).ok_or(RunError::InvalidNode(id))?;
                    node.glyph = lig;
                    if let Some(after) = after {
                        node.after = after;
                    }
                    2
                },
                None => 1,
            };
            if let Some(slot) = run.node_attrs_mut(id).and_then(|a| a.first_mut()) {
                *slot = components;
            }
            cursor = run.next_node(id);
        }
        Ok(())
    }

    fn position(&self, run: &mut dyn GlyphRun) -> Result<(), ShapingError> {
        let ids = scoped_nodes(run);
        let mut base: Option<(NodeId, f32)> = None;
        let mut stacked = 0;

        for id in ids {
            let glyph = glyph_of(run, id)?;
            let code_point = self.code_point(glyph);
            let advance = advance_for(code_point);

            if code_point.is_some_and(is_mark) {
                if let Some((parent, base_advance)) = base {
                    run.attach(id, parent)?;
                    if let Some(node) = run.node_mut(id) {
                        node.attach_offset =
                            Point::new(base_advance / 2.0, MARK_RISE + stacked as f32 * MARK_STACK);
                    }
                    stacked += 1;
                }
            } else {
                // marks never reach back over whitespace
                base = match code_point {
                    Some(cp) if is_space(cp) => None,
                    _ => Some((id, advance)),
                };
                stacked = 0;
            }

            if let Some(node) = run.node_mut(id) {
                node.advance = Point::new(advance, 0.0);
            }
        }
        Ok(())
    }

    fn kern(&self, run: &mut dyn GlyphRun) -> Result<(), ShapingError> {
        let ids = scoped_nodes(run);
        for pair in ids.windows(2) {
            let left = glyph_of(run, pair[0])?;
            let right = glyph_of(run, pair[1])?;
            if let Some(value) = self.kerning.get(&(left, right)) {
                if let Some(node) = run.node_mut(pair[0]) {
                    node.advance.x += value;
                }
            }
        }
        Ok(())
    }
}

impl ShapingEngine for BasicEngine {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn pass_count(&self) -> usize {
        PASS_COUNT
    }

    fn run_passes(
        &self,
        run: &mut dyn GlyphRun,
        start: usize,
        end: usize,
    ) -> Result<(), ShapingError> {
        if start > end || end > PASS_COUNT {
            return Err(ShapingError::PassOutOfRange {
                start,
                end,
                passes: PASS_COUNT,
            });
        }
        log::trace!("BasicEngine: passes {start}..{end} over {} nodes", run.node_count());

        for pass in start..end {
            match pass {
                PASS_SUBSTITUTE => self.substitute(run)?,
                PASS_POSITION => self.position(run)?,
                PASS_KERN => self.kern(run)?,
                _ => {},
            }
        }
        Ok(())
    }

    /// 3 for whitespace, 2 for punctuation, 1 for other base glyphs, 0 for
    /// marks and unknown glyphs
    fn classify_for_cut(&self, glyph: GlyphId) -> u8 {
        match self.code_point(glyph) {
            Some(cp) if is_space(cp) => 3,
            Some(cp) if is_mark(cp) => 0,
            Some(cp) if char::from_u32(cp).is_some_and(|c| c.is_ascii_punctuation()) => 2,
            Some(_) => 1,
            None => 0,
        }
    }

    fn is_context_initial(&self, glyph: GlyphId) -> bool {
        self.ligatures.keys().any(|&(first, _)| first == glyph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapecache_core::{ArenaRun, StaticCharMap};

    fn charmap() -> StaticCharMap {
        let mut map = StaticCharMap::identity(0x20..0x7F);
        map.insert(0x0301, 0x0301);
        map.insert(0x0308, 0x0308);
        map.insert(0xFB01, 0xFB01);
        map.insert(0xFB02, 0xFB02);
        map
    }

    fn shape(text: &str) -> ArenaRun {
        let map = charmap();
        let engine = BasicEngine::new(&map);
        let mut run = ArenaRun::from_text(text, &map, 1);
        engine.run_passes(&mut run, 0, engine.pass_count()).unwrap();
        run.finalise();
        run
    }

    #[test]
    fn test_fi_ligature() {
        let run = shape("fit");
        assert_eq!(run.glyph_ids(), vec![0xFB01, 0x74]);
        let ids = run.node_ids();
        let lig = run.node(ids[0]).unwrap();
        assert_eq!((lig.original, lig.before, lig.after), (0, 0, 1));
        assert_eq!(run.node_attrs(ids[0]), &[2]);
        assert_eq!(run.node_attrs(ids[1]), &[1]);
    }

    #[test]
    fn test_marks_stack_on_base() {
        let run = shape("e\u{301}\u{308}");
        let glyphs = run.shaped_glyphs();
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs[1].attached_to, Some(0));
        assert_eq!(glyphs[2].attached_to, Some(0));
        assert_eq!(glyphs[1].y, MARK_RISE);
        assert_eq!(glyphs[2].y, MARK_RISE + MARK_STACK);
        assert_eq!(glyphs[1].advance, 0.0);
    }

    #[test]
    fn test_mark_after_space_stays_unattached() {
        let glyphs = shape("a \u{301}").shaped_glyphs();
        assert_eq!(glyphs[2].attached_to, None);
    }

    #[test]
    fn test_kerning_pair() {
        let glyphs = shape("AV").shaped_glyphs();
        assert_eq!(glyphs[0].advance, advance_for(Some(0x41)) - 80.0);
        assert_eq!(glyphs[1].x, glyphs[0].advance);
    }

    #[test]
    fn test_pass_range_checked() {
        let map = charmap();
        let engine = BasicEngine::new(&map);
        let mut run = ArenaRun::from_text("a", &map, 0);
        let err = engine.run_passes(&mut run, 1, 4).unwrap_err();
        assert!(matches!(err, ShapingError::PassOutOfRange { .. }));
    }

    #[test]
    fn test_passes_stay_in_scope() {
        let map = charmap();
        let engine = BasicEngine::new(&map);
        let mut run = ArenaRun::from_text("fi fi", &map, 0);
        let ids = run.node_ids();

        let state = run.set_scope(ids[3], ids[4], 2).unwrap();
        engine.run_passes(&mut run, 0, engine.pass_count()).unwrap();
        run.restore_scope(state).unwrap();

        assert_eq!(run.glyph_ids(), vec![0x66, 0x69, 0x20, 0xFB01]);
        assert_eq!(run.node(ids[0]).unwrap().advance, Point::ZERO);
    }

    #[test]
    fn test_cut_classes() {
        let map = charmap();
        let engine = BasicEngine::new(&map);
        assert_eq!(engine.classify_for_cut(0x20), 3);
        assert_eq!(engine.classify_for_cut(0x2C), 2);
        assert_eq!(engine.classify_for_cut(0x61), 1);
        assert_eq!(engine.classify_for_cut(0x0301), 0);
        assert_eq!(engine.classify_for_cut(0xFFFF), 0);
        assert!(engine.is_context_initial(0x66));
        assert!(!engine.is_context_initial(0x61));
    }
}
