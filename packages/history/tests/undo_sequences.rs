//! Tests for undo/redo over editing sessions
//!
//! This tests:
//! - Undoing a session built from editing commands back to the start
//! - Redoing it forward again
//! - Remote changes interleaved with local ones

use folio_history::{History, HistoryMeta};
use folio_model::Node;
use folio_schema_basic::{doc, p, schema, strong};
use folio_transform::{commands, Transform};
use std::time::{Duration, Instant};

struct Session {
    doc: Node,
    history: History,
    clock: Instant,
}

impl Session {
    fn new(doc: Node) -> Self {
        Self {
            doc,
            history: History::default(),
            clock: Instant::now(),
        }
    }

    fn apply(&mut self, tr: Transform, meta: HistoryMeta) {
        self.clock += Duration::from_secs(1);
        self.history.record(&tr, self.clock, meta);
        self.doc = tr.doc().clone();
    }

    fn undo(&mut self) -> bool {
        match self.history.undo(&self.doc) {
            Some(tr) => {
                self.doc = tr.doc().clone();
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo(&self.doc) {
            Some(tr) => {
                self.doc = tr.doc().clone();
                true
            }
            None => false,
        }
    }
}

fn typed(doc: &Node, text: &str, pos: usize) -> Transform {
    let mut tr = Transform::new(doc.clone());
    tr.insert_text(text, pos, None).unwrap();
    tr
}

#[test]
fn test_session_undoes_and_redoes() {
    let start = doc![p!["hello"]].doc;
    let strong_type = schema().mark_type("strong").unwrap();
    let mut session = Session::new(start.clone());

    let split = commands::split_block(&session.doc, 6, 6).unwrap();
    session.apply(split, HistoryMeta::local());
    let world = typed(&session.doc, "world", 8);
    session.apply(world, HistoryMeta::local());
    let bold = commands::toggle_mark(&session.doc, 1, 6, &strong_type, None).unwrap();
    session.apply(bold, HistoryMeta::local());

    let finished = doc![p![strong!["hello"]], p!["world"]].doc;
    assert_eq!(session.doc, finished);
    assert_eq!(session.history.undo_depth(), 3);

    while session.undo() {}
    assert_eq!(session.doc, start);
    assert_eq!(session.history.redo_depth(), 3);

    while session.redo() {}
    assert_eq!(session.doc, finished);
    assert_eq!(session.history.undo_depth(), 3);
}

#[test]
fn test_undo_keeps_remote_edits() {
    let mut session = Session::new(doc![p!["one"], p!["two"]].doc);

    let local = typed(&session.doc, "!", 4);
    session.apply(local, HistoryMeta::local());
    let remote = typed(&session.doc, ">> ", 7);
    session.apply(remote, HistoryMeta::remote());
    let more_local = typed(&session.doc, "?", 5);
    session.apply(more_local, HistoryMeta::local());

    assert_eq!(session.doc.to_string(), r#"doc(paragraph("one!?"), paragraph(">> two"))"#);
    assert!(session.undo());
    assert!(session.undo());
    assert_eq!(session.doc.to_string(), r#"doc(paragraph("one"), paragraph(">> two"))"#);
    assert!(!session.undo());

    assert!(session.redo());
    assert_eq!(session.doc.to_string(), r#"doc(paragraph("one!"), paragraph(">> two"))"#);
}
