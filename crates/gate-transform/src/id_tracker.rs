use std::collections::HashMap;

/// Assigns and remembers the output-item id used for a given content-block
/// index within one stream.
///
/// The OpenAI Responses stream shape pairs `response.output_item.added` and
/// `response.output_item.done` events by `item_id`; when translating from a
/// source family that only has an index (Claude's `content_block_start`/
/// `content_block_stop`, Gemini's candidate parts), the adapter must
/// synthesize one id at `added` time and reuse exactly that id at `done`
/// time, or the two ends of a content block show up as unrelated items to
/// a client that keys off `item_id`.
#[derive(Debug, Default)]
pub struct IdTracker {
    assigned: HashMap<u32, String>,
    next_seq: u64,
}

impl IdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call when emitting the `added` side of a content block: returns a
    /// freshly assigned id and remembers it under `index`.
    pub fn assign(&mut self, index: u32) -> String {
        let id = format!("item_{:016x}", self.next_seq);
        self.next_seq += 1;
        self.assigned.insert(index, id.clone());
        id
    }

    /// Call when emitting the `done` side: returns the id assigned at
    /// `added` time, or synthesizes one if `added` was never observed
    /// (a truncated or reordered upstream stream) so `done` never panics
    /// for want of a ready id.
    pub fn resolve(&mut self, index: u32) -> String {
        if let Some(id) = self.assigned.get(&index) {
            return id.clone();
        }
        self.assign(index)
    }

    pub fn forget(&mut self, index: u32) {
        self.assigned.remove(&index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_the_id_assigned_at_added_time() {
        let mut tracker = IdTracker::new();
        let added_id = tracker.assign(0);
        let done_id = tracker.resolve(0);
        assert_eq!(added_id, done_id);
    }

    #[test]
    fn distinct_indices_get_distinct_ids() {
        let mut tracker = IdTracker::new();
        let a = tracker.assign(0);
        let b = tracker.assign(1);
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_without_prior_assign_still_returns_a_stable_id() {
        let mut tracker = IdTracker::new();
        let first = tracker.resolve(5);
        let second = tracker.resolve(5);
        assert_eq!(first, second);
    }

    #[test]
    fn forget_allows_index_reuse_with_a_fresh_id() {
        let mut tracker = IdTracker::new();
        let first = tracker.assign(0);
        tracker.forget(0);
        let second = tracker.assign(0);
        assert_ne!(first, second);
    }
}
