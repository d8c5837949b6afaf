use crate::RecordId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEdge {
    /// The edge record, holding the cursor, the node link and any edge field.
    pub edge_id: RecordId,
    pub cursor: String,
    pub node_id: Option<RecordId>,
}

/// A run of edges known to be contiguous on the server.
///
/// A `false` page flag means the extremity is the actual boundary of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub(super) edges: Vec<RangeEdge>,
    pub(super) has_previous_page: bool,
    pub(super) has_next_page: bool,
}

impl Segment {
    pub fn edges(&self) -> &[RangeEdge] {
        &self.edges
    }

    pub fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub(super) fn is_head(&self) -> bool {
        !self.has_previous_page
    }

    pub(super) fn is_tail(&self) -> bool {
        !self.has_next_page
    }

    pub(super) fn position(&self, cursor: &str) -> Option<usize> {
        self.edges.iter().position(|edge| edge.cursor == cursor)
    }

    pub(super) fn reverse(&mut self) {
        self.edges.reverse();
        std::mem::swap(&mut self.has_previous_page, &mut self.has_next_page);
    }

    /// Replaces everything after the first `keep` edges by a fetched window.
    ///
    /// When the window ends on an edge we already knew about, the edges following it are still
    /// valid and stay in place. Otherwise they are dropped and the next page flag comes from the
    /// fetch.
    pub(super) fn splice_after(&mut self, keep: usize, incoming: Vec<RangeEdge>, has_next_page: bool) {
        let mut tail = self.edges.split_off(keep.min(self.edges.len()));

        let Some(last) = incoming.last() else {
            if has_next_page {
                self.edges.append(&mut tail);
            } else {
                self.has_next_page = false;
            }
            return;
        };

        match tail.iter().position(|edge| edge.cursor == last.cursor) {
            Some(index) if index + 1 < tail.len() => {
                self.edges.extend(incoming);
                self.edges.extend(tail.drain(index + 1..));
            }
            _ => {
                self.edges.extend(incoming);
                self.has_next_page = has_next_page;
            }
        }
    }

    /// Backward counterpart of [`Segment::splice_after`]: replaces everything before the edge
    /// at `end` by a window fetched with `last`/`before`. `incoming` is in server order.
    pub(super) fn splice_before(&mut self, end: usize, mut incoming: Vec<RangeEdge>, has_previous_page: bool) {
        let keep = self.edges.len().saturating_sub(end);
        incoming.reverse();

        self.reverse();
        self.splice_after(keep, incoming, has_previous_page);
        self.reverse();
    }

    /// Merges `other` into this segment when they share a cursor, this segment being the most
    /// recent one. Returns `other` untouched when the two are disjoint, nothing when it was
    /// absorbed.
    pub(super) fn absorb(&mut self, mut other: Segment) -> Option<Segment> {
        let (Some(first), Some(last)) = (self.edges.first(), self.edges.last()) else {
            return Some(other);
        };

        let start = other.position(&first.cursor);
        let end = other.position(&last.cursor);

        if start.is_none() && end.is_none() {
            let overlaps = other.edges.iter().any(|edge| self.position(&edge.cursor).is_some());
            return if overlaps { None } else { Some(other) };
        }

        let mut suffix = match end {
            Some(end) => {
                if end + 1 < other.edges.len() {
                    self.has_next_page = other.has_next_page;
                }
                other.edges.split_off(end + 1)
            }
            None => Vec::new(),
        };

        let mut edges = match start {
            Some(start) => {
                if start > 0 {
                    self.has_previous_page = other.has_previous_page;
                }
                other.edges.truncate(start);
                other.edges
            }
            None => Vec::new(),
        };

        edges.append(&mut self.edges);
        edges.append(&mut suffix);
        self.edges = dedup_cursors(edges);

        None
    }
}

fn dedup_cursors(edges: Vec<RangeEdge>) -> Vec<RangeEdge> {
    let mut seen = fxhash::FxHashSet::default();
    edges
        .into_iter()
        .filter(|edge| seen.insert(edge.cursor.clone()))
        .collect()
}
