//! Hydration cursor - Walks existing server DOM in tree order.
//!
//! The cursor points at the next sibling an insert may adopt. Comments are
//! skipped transparently unless they open a frame range (`rmx:f:<id>`), which
//! a frame insert adopts. A bounded cursor stops at a frame's end marker.

use crate::dom::DomNode;

const FRAME_START: &str = "rmx:f:";
const FRAME_END: &str = "/rmx:f";

pub(crate) fn is_frame_start(node: &DomNode) -> bool {
    node.is_comment()
        && node
            .data()
            .is_some_and(|data| data.trim().starts_with(FRAME_START))
}

pub(crate) fn is_frame_end(node: &DomNode) -> bool {
    node.is_comment() && node.data().is_some_and(|data| data.trim() == FRAME_END)
}

/// Matching end marker for the frame opened by `start`, counting nested
/// frames.
pub(crate) fn find_frame_end(start: &DomNode) -> Option<DomNode> {
    let mut depth = 0usize;
    let mut current = start.next_sibling();
    while let Some(node) = current {
        if is_frame_start(&node) {
            depth += 1;
        } else if is_frame_end(&node) {
            if depth == 0 {
                return Some(node);
            }
            depth -= 1;
        }
        current = node.next_sibling();
    }
    None
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    next: Option<DomNode>,
    end: Option<DomNode>,
    /// Unexpected server nodes a mismatch left in place.
    kept: Vec<DomNode>,
}

impl Cursor {
    /// Cursor over `first` and its following siblings.
    pub(crate) fn new(first: Option<DomNode>) -> Self {
        Self {
            next: first,
            end: None,
            kept: Vec::new(),
        }
    }

    /// Cursor over the siblings strictly between `first` and `end`.
    pub(crate) fn bounded(first: Option<DomNode>, end: DomNode) -> Self {
        Self {
            next: first,
            end: Some(end),
            kept: Vec::new(),
        }
    }

    fn in_bounds(&self, node: Option<DomNode>) -> Option<DomNode> {
        node.filter(|node| Some(node) != self.end.as_ref())
    }

    /// Next adoptable node, skipping plain comments.
    pub(crate) fn peek(&mut self) -> Option<DomNode> {
        loop {
            let node = self.in_bounds(self.next.clone())?;
            if node.is_comment() && !is_frame_start(&node) {
                self.next = node.next_sibling();
                continue;
            }
            return Some(node);
        }
    }

    /// Adoptable node after `node`, without moving the cursor.
    pub(crate) fn peek_after(&self, node: &DomNode) -> Option<DomNode> {
        let mut current = self.in_bounds(node.next_sibling());
        while let Some(candidate) = current {
            if !(candidate.is_comment() && !is_frame_start(&candidate)) {
                return Some(candidate);
            }
            current = self.in_bounds(candidate.next_sibling());
        }
        None
    }

    /// Continue after `node`, which was just adopted.
    pub(crate) fn advance_past(&mut self, node: &DomNode) {
        self.next = node.next_sibling();
    }

    /// Leave `node` in the DOM even if nothing adopts it.
    pub(crate) fn keep(&mut self, node: &DomNode) {
        self.kept.push(node.clone());
    }

    /// Where a freshly created node goes so it lands at the cursor.
    pub(crate) fn insertion_point(&self) -> Option<DomNode> {
        self.next.clone().or_else(|| self.end.clone())
    }

    /// Remove the non-comment nodes the cursor never reached, except the
    /// ones a mismatch kept. Returns how many were removed.
    pub(crate) fn remove_trailing(self) -> usize {
        let mut removed = 0;
        let mut current = self.in_bounds(self.next.clone());
        while let Some(node) = current {
            current = self.in_bounds(node.next_sibling());
            if node.is_comment() || self.kept.contains(&node) {
                continue;
            }
            tracing::warn!(node = ?node, "hydration: removing unmatched server node");
            node.remove();
            removed += 1;
        }
        removed
    }
}
