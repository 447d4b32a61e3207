//! Focus & Selection - Keep focus and selection alive across DOM moves.
//!
//! Moving a node detaches it for a moment, and detaching blurs whatever was
//! focused inside it and drops a document selection anchored in it. Every
//! pass that mutates the DOM captures the state first and restores it after
//! mutating, before `commit` listeners run.
//!
//! # Example
//!
//! ```ignore
//! let saved = focus::capture(&document);
//! // ... mutate, possibly moving the focused input ...
//! focus::restore(&document, saved);
//! ```

use crate::dom::{Document, DomNode, SelectionRange};

/// Focus and selection state taken before a pass.
#[derive(Debug, Clone, Default)]
pub struct SelectionSnapshot {
    active: Option<DomNode>,
    /// Text selection of the active form control.
    control_range: Option<(usize, usize)>,
    range: Option<SelectionRange>,
}

impl SelectionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.range.is_none()
    }
}

/// Capture the document's focus and selection.
pub fn capture(document: &Document) -> SelectionSnapshot {
    let active = document.active_element();
    let control_range = active.as_ref().and_then(DomNode::selection_range);
    SelectionSnapshot {
        active,
        control_range,
        range: document.selection(),
    }
}

/// Put back what [`capture`] saw, for nodes that are still in the document.
/// Focus that moved elsewhere during the pass is left alone.
pub fn restore(document: &Document, snapshot: SelectionSnapshot) {
    if snapshot.is_empty() {
        return;
    }

    if let Some(active) = snapshot.active {
        if active.is_connected() && document.active_element().is_none() {
            active.focus();
            if let Some((start, end)) = snapshot.control_range {
                active.set_selection_range(start, end);
            }
        }
    }

    if let Some(range) = snapshot.range {
        let intact = range.anchor_node.is_connected() && range.focus_node.is_connected();
        if intact && document.selection().is_none() {
            document.set_selection(Some(range));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_after_move() {
        let doc = Document::new();
        let body = doc.body();
        let first = doc.create_element("p");
        let input = doc.create_element("input");
        body.append_child(&first);
        body.append_child(&input);
        input.focus();
        input.set_selection_range(1, 3);

        let saved = capture(&doc);
        body.insert_before(&input, Some(&first));
        assert!(doc.active_element().is_none());

        restore(&doc, saved);
        assert_eq!(doc.active_element(), Some(input.clone()));
        assert_eq!(input.selection_range(), Some((1, 3)));
    }

    #[test]
    fn test_removed_node_stays_blurred() {
        let doc = Document::new();
        let input = doc.create_element("input");
        doc.body().append_child(&input);
        input.focus();

        let saved = capture(&doc);
        input.remove();
        restore(&doc, saved);
        assert!(doc.active_element().is_none());
    }

    #[test]
    fn test_document_selection_restored() {
        let doc = Document::new();
        let body = doc.body();
        let text = doc.create_text_node("hello");
        let p = doc.create_element("p");
        p.append_child(&text);
        body.append_child(&p);
        let range = SelectionRange {
            anchor_node: text.clone(),
            anchor_offset: 1,
            focus_node: text.clone(),
            focus_offset: 4,
        };
        doc.set_selection(Some(range.clone()));

        let saved = capture(&doc);
        body.append_child(&p);
        restore(&doc, saved);
        assert_eq!(doc.selection(), Some(range));
    }
}
