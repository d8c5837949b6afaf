use crate::query::Selection;

/// What a node of the query still needs once compared with the store.
#[derive(Debug)]
pub(crate) enum Outcome {
    Matched,
    /// Nothing under the node is cached, it must be fetched as requested.
    NoData,
    /// Only these children, or filtered clones of them, are missing.
    Partial(Vec<Selection>),
}

impl Outcome {
    pub fn from_missing(node: &Selection, missing: Vec<Selection>) -> Self {
        if missing.is_empty() {
            return Outcome::Matched;
        }

        let children = node.selections();

        let wanted = children.iter().filter(|child| !child.is_generated()).collect::<Vec<_>>();
        let missing_wanted = missing.iter().filter(|child| !child.is_generated()).collect::<Vec<_>>();
        if wanted.len() == missing_wanted.len() && wanted.iter().zip(&missing_wanted).all(|(left, right)| left.ptr_eq(right)) {
            return Outcome::NoData;
        }

        // Requisite children come along so the response can be normalized.
        let partial = children
            .iter()
            .filter_map(|child| {
                missing
                    .iter()
                    .find(|selection| selection.id() == child.id())
                    .cloned()
                    .or_else(|| child.is_requisite().then(|| child.clone()))
            })
            .collect();

        Outcome::Partial(partial)
    }

    /// The part of `node` left to fetch, reusing it untouched when nothing is cached.
    pub fn into_selection(self, node: &Selection) -> Option<Selection> {
        match self {
            Outcome::Matched => None,
            Outcome::NoData => Some(node.clone()),
            Outcome::Partial(children) => Some(node.with_selections(children)),
        }
    }
}

/// Merges two lists of missing selections taken from the same `original` children, keeping
/// the original order.
pub(crate) fn union(original: &[Selection], left: Vec<Selection>, right: Vec<Selection>) -> Vec<Selection> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }

    let find = |missing: &[Selection], node: &Selection| missing.iter().find(|selection| selection.id() == node.id()).cloned();

    original
        .iter()
        .filter_map(|node| match (find(&left, node), find(&right, node)) {
            (None, None) => None,
            (Some(selection), None) | (None, Some(selection)) => Some(selection),
            (Some(left), Some(right)) => {
                if left.ptr_eq(node) || right.ptr_eq(node) {
                    return Some(node.clone());
                }

                let children = union(node.selections(), left.selections().to_vec(), right.selections().to_vec());
                Outcome::from_missing(node, children).into_selection(node)
            }
        })
        .collect()
}
