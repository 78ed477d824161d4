//! # Undo History
//!
//! Records transforms as undoable events and builds the transforms that
//! undo and redo them.
//!
//! ## Design
//!
//! - Every change, tracked or not, appends its step maps to one history
//!   mapping; stored inverse steps remember the map index of their step
//! - Undo maps each stored inverse through everything recorded after it,
//!   so edits made since (including remote ones) are respected
//! - The maps of an undo are mirrors of the maps they revert, which lets
//!   positions deleted and then restored map back to where they were
//! - Changes close together in time and place coalesce into one event
//! - New tracked changes clear the redo stack
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(HistoryConfig::default());
//! history.record(&tr, Instant::now(), HistoryMeta::local());
//!
//! if let Some(undo) = history.undo(tr.doc()) {
//!     doc = undo.doc().clone();
//! }
//! ```

use crate::config::{HistoryConfig, HistoryMeta};
use folio_model::Node;
use folio_transform::{Mappable, Mapping, Step, StepMap, Transform};
use std::time::Instant;
use tracing::{debug, warn};

/// An inverse step and the index of the map its original step produced.
#[derive(Debug, Clone)]
struct StoredStep {
    inverse: Step,
    map_index: usize,
    /// Whether the map at `map_index` is exactly the inverse of this step's
    /// map. Merged steps cover several maps and are not.
    mirrored: bool,
}

/// A group of steps that are undone and redone together
#[derive(Debug, Clone, Default)]
struct Event {
    /// In the order they were recorded.
    steps: Vec<StoredStep>,
}

impl Event {
    fn push(&mut self, stored: StoredStep) {
        if let Some(last) = self.steps.last_mut() {
            if last.map_index + 1 == stored.map_index {
                if let Some(merged) = stored.inverse.merge(&last.inverse) {
                    *last = StoredStep {
                        inverse: merged,
                        map_index: stored.map_index,
                        mirrored: false,
                    };
                    return;
                }
            }
        }
        self.steps.push(stored);
    }
}

/// Undo/redo history for one document
#[derive(Debug)]
pub struct History {
    config: HistoryConfig,

    /// Undoable events (most recent last)
    done: Vec<Event>,

    /// Undone events (most recent last)
    undone: Vec<Event>,

    /// Maps of every change recorded, undo and redo included
    mapping: Mapping,

    /// Time of the last tracked change, `None` when the group is closed
    prev_time: Option<Instant>,

    /// Ranges touched by the last tracked change, in the current document
    prev_ranges: Option<Vec<(usize, usize)>>,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            done: Vec::new(),
            undone: Vec::new(),
            mapping: Mapping::new(),
            prev_time: None,
            prev_ranges: None,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Record a transform that was applied to the document.
    pub fn record(&mut self, tr: &Transform, time: Instant, meta: HistoryMeta) {
        if !tr.doc_changed() {
            return;
        }
        let base = self.mapping.len();
        for map in tr.mapping().maps() {
            self.mapping.append_map(map.clone(), None);
        }

        if !meta.tracked() {
            debug!(steps = tr.steps().len(), remote = meta.remote, "mapped history through change");
            if let Some(ranges) = self.prev_ranges.take() {
                self.prev_ranges = Some(map_ranges(&ranges, tr.mapping()));
            }
            self.compact();
            return;
        }

        let new_group = meta.new_group
            || self.done.is_empty()
            || self
                .prev_time
                .map(|prev| time.saturating_duration_since(prev) >= self.config.new_group_delay)
                .unwrap_or(true)
            || !self.is_adjacent(tr);

        if new_group {
            self.done.push(Event::default());
        }
        if let Some(event) = self.done.last_mut() {
            for (i, inverse) in tr.inverted().iter().enumerate() {
                event.push(StoredStep {
                    inverse: inverse.clone(),
                    map_index: base + i,
                    mirrored: true,
                });
            }
        }
        debug!(steps = tr.steps().len(), new_group, depth = self.done.len(), "recorded change");

        self.undone.clear();
        self.prev_time = Some(time);
        self.prev_ranges = Some(ranges_for(tr.mapping().maps()));
        self.evict();
    }

    /// Build the transform undoing the most recent event, applied to `doc`.
    /// Returns `None` when there is nothing to undo or the event no longer
    /// applies, in which case the event is dropped.
    ///
    /// The returned transform must be applied: the history assumes its
    /// result is the new document.
    pub fn undo(&mut self, doc: &Node) -> Option<Transform> {
        self.pop_event(doc, false)
    }

    /// Build the transform redoing the most recently undone event.
    pub fn redo(&mut self, doc: &Node) -> Option<Transform> {
        self.pop_event(doc, true)
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Make the next tracked change start a new event.
    pub fn close_group(&mut self) {
        self.prev_time = None;
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
        self.mapping = Mapping::new();
        self.prev_time = None;
        self.prev_ranges = None;
    }

    fn pop_event(&mut self, doc: &Node, redo: bool) -> Option<Transform> {
        let stack = if redo { &mut self.undone } else { &mut self.done };
        let event = stack.pop()?;

        let mut tr = Transform::new(doc.clone());
        let mut reverse = Event::default();
        for stored in event.steps.iter().rev() {
            let since = self.mapping.slice_from(stored.map_index + 1);
            let Some(step) = stored.inverse.map(&since) else {
                debug!(step = %stored.inverse, "stored step was deleted by a later change");
                continue;
            };
            if let Err(e) = tr.maybe_step(step) {
                debug!(error = %e, "stored step no longer applies");
                continue;
            }
            let (Some(map), Some(inverse)) = (tr.mapping().maps().last(), tr.inverted().last()) else {
                continue;
            };
            let mirror = stored.mirrored.then_some(stored.map_index);
            self.mapping.append_map(map.clone(), mirror);
            reverse.steps.push(StoredStep {
                inverse: inverse.clone(),
                map_index: self.mapping.len() - 1,
                mirrored: true,
            });
        }

        self.prev_time = None;
        self.prev_ranges = None;

        if !tr.doc_changed() {
            warn!(redo, "dropping history event that no longer applies");
            self.compact();
            return None;
        }
        debug!(redo, steps = tr.steps().len(), "replayed history event");
        if redo {
            self.done.push(reverse);
            self.evict();
        } else {
            self.undone.push(reverse);
        }
        Some(tr)
    }

    fn is_adjacent(&self, tr: &Transform) -> bool {
        let Some(prev) = &self.prev_ranges else {
            return false;
        };
        let Some(first) = tr.mapping().maps().first() else {
            return true;
        };
        let mut adjacent = false;
        first.for_each(|start, end, _, _| {
            if prev.iter().any(|&(from, to)| start <= to && end >= from) {
                adjacent = true;
            }
        });
        adjacent
    }

    fn evict(&mut self) {
        if self.config.depth > 0 && self.done.len() > self.config.depth {
            let excess = self.done.len() - self.config.depth;
            self.done.drain(..excess);
        }
        self.compact();
    }

    /// Drop maps no stored step needs any more.
    fn compact(&mut self) {
        let oldest = self
            .done
            .iter()
            .chain(self.undone.iter())
            .flat_map(|event| event.steps.iter())
            .map(|s| s.map_index)
            .min();
        let Some(oldest) = oldest else {
            self.mapping = Mapping::new();
            return;
        };
        if oldest == 0 {
            return;
        }
        self.mapping.drop_front(oldest);
        for event in self.done.iter_mut().chain(self.undone.iter_mut()) {
            for stored in &mut event.steps {
                stored.map_index -= oldest;
            }
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

/// The ranges changed by the last map that changed anything.
fn ranges_for(maps: &[StepMap]) -> Vec<(usize, usize)> {
    let mut result = Vec::new();
    for map in maps.iter().rev() {
        map.for_each(|_, _, from, to| result.push((from, to)));
        if !result.is_empty() {
            break;
        }
    }
    result
}

fn map_ranges(ranges: &[(usize, usize)], mapping: &Mapping) -> Vec<(usize, usize)> {
    ranges
        .iter()
        .map(|&(from, to)| (mapping.map(from, 1), mapping.map(to, -1)))
        .filter(|(from, to)| from <= to)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema_basic::{doc, p, schema, strong};
    use std::time::Duration;

    fn type_text(doc: &Node, text: &str, pos: usize) -> Transform {
        let mut tr = Transform::new(doc.clone());
        tr.insert_text(text, pos, None).unwrap();
        tr
    }

    #[test]
    fn test_history_creation() {
        let history = History::default();
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
        assert!(!history.can_undo());
        assert_eq!(history.config().depth, 100);
    }

    #[test]
    fn test_typing_coalesces_into_one_event() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let tr1 = type_text(&d, "a", 1);
        history.record(&tr1, t0, HistoryMeta::local());
        let tr2 = type_text(tr1.doc(), "b", 2);
        history.record(&tr2, t0 + Duration::from_millis(100), HistoryMeta::local());
        assert_eq!(tr2.doc().to_string(), r#"doc(paragraph("abx"))"#);
        assert_eq!(history.undo_depth(), 1);

        let undo = history.undo(tr2.doc()).unwrap();
        assert_eq!(undo.doc(), &d.doc);
        assert_eq!(undo.steps().len(), 1);
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 1);
    }

    #[test]
    fn test_idle_time_starts_new_event() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let tr1 = type_text(&d, "a", 1);
        history.record(&tr1, t0, HistoryMeta::local());
        let tr2 = type_text(tr1.doc(), "b", 2);
        history.record(&tr2, t0 + Duration::from_millis(600), HistoryMeta::local());
        assert_eq!(history.undo_depth(), 2);

        let undo = history.undo(tr2.doc()).unwrap();
        assert_eq!(undo.doc(), tr1.doc());
    }

    #[test]
    fn test_distant_edit_starts_new_event() {
        let d = doc![p!["hello world"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let tr1 = type_text(&d, "a", 1);
        history.record(&tr1, t0, HistoryMeta::local());
        let tr2 = type_text(tr1.doc(), "b", 12);
        history.record(&tr2, t0, HistoryMeta::local());
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn test_separate_and_close_group() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let tr1 = type_text(&d, "a", 1);
        history.record(&tr1, t0, HistoryMeta::local());
        let tr2 = type_text(tr1.doc(), "b", 2);
        history.record(&tr2, t0, HistoryMeta::local().separate());
        assert_eq!(history.undo_depth(), 2);

        history.close_group();
        let tr3 = type_text(tr2.doc(), "c", 3);
        history.record(&tr3, t0, HistoryMeta::local());
        assert_eq!(history.undo_depth(), 3);
    }

    #[test]
    fn test_undo_then_redo() {
        let d = doc![p!["hello"]];
        let mut history = History::default();
        let strong_mark = schema().mark("strong", None).unwrap();

        let mut tr = Transform::new(d.doc.clone());
        tr.add_mark(1, 6, &strong_mark).unwrap();
        history.record(&tr, Instant::now(), HistoryMeta::local());

        let undo = history.undo(tr.doc()).unwrap();
        assert_eq!(undo.doc(), &d.doc);
        let redo = history.redo(undo.doc()).unwrap();
        let expected = doc![p![strong!["hello"]]];
        assert_eq!(redo.doc(), &expected.doc);
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_empty_stacks_return_none() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        assert!(history.undo(&d).is_none());
        assert!(history.redo(&d).is_none());
    }

    #[test]
    fn test_new_change_clears_redo() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let tr1 = type_text(&d, "a", 1);
        history.record(&tr1, t0, HistoryMeta::local());
        let undo = history.undo(tr1.doc()).unwrap();
        assert_eq!(history.redo_depth(), 1);

        let tr2 = type_text(undo.doc(), "b", 1);
        history.record(&tr2, t0, HistoryMeta::local());
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_remote_change_is_not_undone() {
        let d = doc![p!["hello"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let local = type_text(&d, "X", 6);
        history.record(&local, t0, HistoryMeta::local());
        let remote = type_text(local.doc(), "AB", 1);
        history.record(&remote, t0, HistoryMeta::remote());
        assert_eq!(history.undo_depth(), 1);

        let undo = history.undo(remote.doc()).unwrap();
        assert_eq!(undo.doc().to_string(), r#"doc(paragraph("ABhello"))"#);
    }

    #[test]
    fn test_event_deleted_remotely_is_dropped() {
        let d = doc![p!["hello"]];
        let mut history = History::default();

        let local = type_text(&d, "X", 3);
        history.record(&local, Instant::now(), HistoryMeta::local());
        let mut remote = Transform::new(local.doc().clone());
        remote.delete(2, 6).unwrap();
        history.record(&remote, Instant::now(), HistoryMeta::remote());

        assert!(history.undo(remote.doc()).is_none());
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_undo_restores_positions_through_earlier_undo() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let t0 = Instant::now();

        let typed = type_text(&d, "abc", 1);
        history.record(&typed, t0, HistoryMeta::local());
        let mut deleted = Transform::new(typed.doc().clone());
        deleted.delete(1, 4).unwrap();
        history.record(&deleted, t0 + Duration::from_secs(1), HistoryMeta::local());

        let undo_delete = history.undo(deleted.doc()).unwrap();
        assert_eq!(undo_delete.doc(), typed.doc());
        let undo_typing = history.undo(undo_delete.doc()).unwrap();
        assert_eq!(undo_typing.doc(), &d.doc);
    }

    #[test]
    fn test_depth_evicts_oldest() {
        let config = HistoryConfig {
            depth: 2,
            ..HistoryConfig::default()
        };
        let mut history = History::new(config);
        let mut current = doc![p!["x"]].doc;
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            let tr = type_text(&current, text, 1 + i);
            history.record(&tr, Instant::now(), HistoryMeta::local().separate());
            current = tr.doc().clone();
        }
        assert_eq!(history.undo_depth(), 2);

        let first = history.undo(&current).unwrap();
        let second = history.undo(first.doc()).unwrap();
        assert_eq!(second.doc().to_string(), r#"doc(paragraph("ax"))"#);
        assert!(history.undo(second.doc()).is_none());
    }

    #[test]
    fn test_clear() {
        let d = doc![p!["x"]];
        let mut history = History::default();
        let tr = type_text(&d, "a", 1);
        history.record(&tr, Instant::now(), HistoryMeta::local());
        history.clear();
        assert!(!history.can_undo());
        assert!(history.undo(tr.doc()).is_none());
    }

    #[test]
    fn test_untracked_change_only_maps() {
        let d = doc![p!["hello"]];
        let mut history = History::default();

        let local = type_text(&d, "X", 6);
        history.record(&local, Instant::now(), HistoryMeta::local());
        let fixup = type_text(local.doc(), "!", 1);
        history.record(&fixup, Instant::now(), HistoryMeta::untracked());
        assert_eq!(history.undo_depth(), 1);

        let undo = history.undo(fixup.doc()).unwrap();
        assert_eq!(undo.doc().to_string(), r#"doc(paragraph("!hello"))"#);
    }

    #[test]
    fn test_remote_changes_do_not_grow_mapping() {
        let mut doc = doc![p!["hello"]].doc;
        let mut history = History::default();
        for _ in 0..50 {
            let remote = type_text(&doc, "r", 1);
            history.record(&remote, Instant::now(), HistoryMeta::remote());
            doc = remote.doc().clone();
        }
        assert_eq!(history.mapping.len(), 0);

        let local = type_text(&doc, "X", 1);
        history.record(&local, Instant::now(), HistoryMeta::local());
        doc = local.doc().clone();
        for _ in 0..50 {
            let remote = type_text(&doc, "r", 1);
            history.record(&remote, Instant::now(), HistoryMeta::remote());
            doc = remote.doc().clone();
        }
        assert_eq!(history.mapping.len(), 51);

        let undo = history.undo(&doc).unwrap();
        assert_eq!(undo.doc().text_content(), "r".repeat(100) + "hello");
    }
}
