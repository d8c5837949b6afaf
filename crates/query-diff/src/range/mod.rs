//! Tracks which windows of a paginated connection are cached.
//!
//! Edges are kept in segments of edges known to be contiguous on the server. Page info flags are
//! tracked per segment extremity: the segment with no previous page is the head of the
//! connection, the one with no next page its tail. Segments in between have no known position
//! and are only reachable through one of their cursors.

mod calls;
mod segment;

use fxhash::FxHashMap;
use indexmap::{IndexMap, IndexSet};

pub use self::{
    calls::{RANGE_ARGUMENTS, RangeCalls, RangeCallsError},
    segment::{RangeEdge, Segment},
};
use crate::RecordId;

#[derive(Debug, Clone, Default)]
pub struct Range {
    segments: Vec<Segment>,
    cursors: FxHashMap<String, (usize, usize)>,
    /// Edges fetched through `find`, by node id. Their position in the connection is unknown.
    found_edges: IndexMap<RecordId, RangeEdge>,
    satisfied_calls: IndexSet<RangeCalls>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// What part of a requested window is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDiff {
    /// Cached edges of the window, in server order.
    pub cached_edges: Vec<RangeEdge>,
    /// The part of the window still to fetch.
    pub residual: Option<RangeCalls>,
    /// Whether the page info of the window can be answered from the cache.
    pub page_info_known: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error("Cannot merge a window anchored at unknown cursor '{cursor}'")]
    UnknownCursor { cursor: String },
}

impl Range {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_satisfied(&self, calls: &RangeCalls) -> bool {
        self.satisfied_calls.contains(calls)
    }

    fn head(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_head)
    }

    fn tail(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_tail)
    }

    pub fn diff(&self, calls: &RangeCalls) -> RangeDiff {
        let (cached_edges, residual) = match calls {
            RangeCalls::First { count, after } => self.diff_first(*count, after.as_deref()),
            RangeCalls::Last { count, before } => self.diff_last(*count, before.as_deref()),
            RangeCalls::Find(id) => match self.find_edge(id) {
                Some(edge) => (vec![edge.clone()], None),
                None => (Vec::new(), Some(calls.clone())),
            },
            RangeCalls::All => match self.segments.iter().find(|segment| segment.is_head() && segment.is_tail()) {
                Some(segment) => (segment.edges.clone(), None),
                None => (Vec::new(), Some(RangeCalls::All)),
            },
        };

        RangeDiff {
            cached_edges,
            page_info_known: residual.is_none(),
            residual,
        }
    }

    fn diff_first(&self, count: usize, after: Option<&str>) -> (Vec<RangeEdge>, Option<RangeCalls>) {
        let requested = || RangeCalls::First {
            count,
            after: after.map(str::to_string),
        };

        let anchor = match after {
            None => self.head().map(|segment| (segment, 0)),
            Some(cursor) => self.cursors.get(cursor).map(|&(segment, index)| (segment, index + 1)),
        };
        let Some((segment, start)) = anchor else {
            return (Vec::new(), Some(requested()));
        };

        let segment = &self.segments[segment];
        let end = (start + count).min(segment.edges.len());
        let cached = segment.edges[start..end].to_vec();

        if cached.len() == count || segment.is_tail() {
            return (cached, None);
        }

        let residual = RangeCalls::First {
            count: count - cached.len(),
            after: cached
                .last()
                .map(|edge| edge.cursor.clone())
                .or_else(|| after.map(str::to_string)),
        };

        (cached, Some(residual))
    }

    fn diff_last(&self, count: usize, before: Option<&str>) -> (Vec<RangeEdge>, Option<RangeCalls>) {
        let requested = || RangeCalls::Last {
            count,
            before: before.map(str::to_string),
        };

        let anchor = match before {
            None => self
                .tail()
                .map(|segment| (segment, self.segments[segment].edges.len())),
            Some(cursor) => self.cursors.get(cursor).copied(),
        };
        let Some((segment, end)) = anchor else {
            return (Vec::new(), Some(requested()));
        };

        let segment = &self.segments[segment];
        let start = end.saturating_sub(count);
        let cached = segment.edges[start..end].to_vec();

        if cached.len() == count || segment.is_head() {
            return (cached, None);
        }

        let residual = RangeCalls::Last {
            count: count - cached.len(),
            before: cached
                .first()
                .map(|edge| edge.cursor.clone())
                .or_else(|| before.map(str::to_string)),
        };

        (cached, Some(residual))
    }

    fn find_edge(&self, node_id: &str) -> Option<&RangeEdge> {
        self.segments
            .iter()
            .flat_map(|segment| segment.edges.iter())
            .find(|edge| edge.node_id.as_ref().is_some_and(|id| id.as_str() == node_id))
            .or_else(|| self.found_edges.get(node_id))
    }

    /// Inserts a fetched window of edges.
    ///
    /// The window is anchored at the head of the connection, at its tail, or at a known cursor,
    /// and is then merged with every segment it shares a cursor with.
    pub fn merge(&mut self, calls: &RangeCalls, edges: Vec<RangeEdge>, page_info: PageInfo) -> Result<(), RangeError> {
        let modified = match calls {
            RangeCalls::First { after: None, .. } => match self.head() {
                Some(head) => {
                    self.segments[head].splice_after(0, edges, page_info.has_next_page);
                    head
                }
                None => self.push(Segment {
                    edges,
                    has_previous_page: false,
                    has_next_page: page_info.has_next_page,
                }),
            },
            RangeCalls::First { after: Some(cursor), .. } => {
                let (segment, index) = self.position(cursor)?;
                self.segments[segment].splice_after(index + 1, edges, page_info.has_next_page);
                segment
            }
            RangeCalls::Last { before: None, .. } => match self.tail() {
                Some(tail) => {
                    let end = self.segments[tail].edges.len();
                    self.segments[tail].splice_before(end, edges, page_info.has_previous_page);
                    tail
                }
                None => self.push(Segment {
                    edges,
                    has_previous_page: page_info.has_previous_page,
                    has_next_page: false,
                }),
            },
            RangeCalls::Last { before: Some(cursor), .. } => {
                let (segment, index) = self.position(cursor)?;
                self.segments[segment].splice_before(index, edges, page_info.has_previous_page);
                segment
            }
            RangeCalls::Find(_) => {
                for edge in edges {
                    if let Some(node_id) = edge.node_id.clone() {
                        self.found_edges.insert(node_id, edge);
                    }
                }
                self.satisfied_calls.insert(calls.clone());
                return Ok(());
            }
            RangeCalls::All => {
                self.segments.clear();
                self.push(Segment {
                    edges,
                    has_previous_page: false,
                    has_next_page: false,
                })
            }
        };

        self.coalesce(modified);
        self.satisfied_calls.insert(calls.clone());

        Ok(())
    }

    fn position(&self, cursor: &str) -> Result<(usize, usize), RangeError> {
        self.cursors
            .get(cursor)
            .copied()
            .ok_or_else(|| RangeError::UnknownCursor {
                cursor: cursor.to_string(),
            })
    }

    fn push(&mut self, segment: Segment) -> usize {
        self.segments.push(segment);
        self.segments.len() - 1
    }

    /// Merges the freshly modified segment with the segments it now overlaps. Segments left
    /// claiming the same boundary as the fresh one are stale and dropped.
    fn coalesce(&mut self, modified: usize) {
        let mut current = self.segments.remove(modified);
        let mut kept = Vec::with_capacity(self.segments.len());

        for other in std::mem::take(&mut self.segments) {
            if let Some(other) = current.absorb(other) {
                kept.push(other);
            }
        }

        kept.retain(|other| !(current.is_head() && other.is_head()) && !(current.is_tail() && other.is_tail()));

        kept.push(current);
        kept.sort_by_key(|segment| match (segment.is_head(), segment.is_tail()) {
            (true, _) => 0,
            (false, false) => 1,
            (false, true) => 2,
        });

        self.segments = kept;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.cursors.clear();
        for (segment_index, segment) in self.segments.iter().enumerate() {
            for (edge_index, edge) in segment.edges.iter().enumerate() {
                self.cursors.insert(edge.cursor.clone(), (segment_index, edge_index));
            }
        }
    }
}
