//! Breadth-first work queue and the visited ledger.

use std::collections::{HashSet, VecDeque};

/// A page waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Canonical URL
    pub url: String,
    /// Link distance from the seed (seed is 0)
    pub depth: usize,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Result of trying to claim a URL for processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Newly visited; carries the 1-based visit sequence number
    Fresh(usize),
    /// Already visited in this run
    Duplicate,
    /// The page cap is reached, nothing more may be visited
    CapReached,
}

/// Canonical URLs visited during one run. Only ever grows.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns `true` if `url` was not present before
    pub fn insert(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    /// Cap check and insert in one step.
    ///
    /// Callers sharing the set across workers hold its lock for the whole
    /// call, which makes the check-and-set atomic.
    pub fn claim(&mut self, url: &str, cap: usize) -> Admission {
        if self.urls.len() >= cap {
            return Admission::CapReached;
        }
        if !self.insert(url) {
            return Admission::Duplicate;
        }
        Admission::Fresh(self.urls.len())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// FIFO of pending tasks kept sorted by depth.
///
/// Tasks may only be pushed at the depth of the current tail or deeper, so
/// draining from the front always finishes depth `d` before depth `d + 1`.
/// A URL already waiting in the queue is not queued a second time.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    pending: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frontier holding only the seed at depth 0
    pub fn seeded(seed: impl Into<String>) -> Self {
        let mut frontier = Self::new();
        frontier.push(CrawlTask::new(seed, 0));
        frontier
    }

    /// Queue a task. Returns `false` if the URL is already pending or the
    /// task would break depth order.
    pub fn push(&mut self, task: CrawlTask) -> bool {
        if let Some(tail) = self.queue.back() {
            if task.depth < tail.depth {
                ::log::warn!(
                    "Refusing out-of-order task {} at depth {} (tail depth {})",
                    task.url,
                    task.depth,
                    tail.depth
                );
                return false;
            }
        }
        if !self.pending.insert(task.url.clone()) {
            return false;
        }
        self.queue.push_back(task);
        true
    }

    pub fn pop(&mut self) -> Option<CrawlTask> {
        let task = self.queue.pop_front()?;
        self.pending.remove(&task.url);
        Some(task)
    }

    /// Depth of the next task, if any
    pub fn current_depth(&self) -> Option<usize> {
        self.queue.front().map(|task| task.depth)
    }

    /// Take every pending task at the lowest queued depth, in queue order
    pub fn next_level(&mut self) -> Option<(usize, Vec<CrawlTask>)> {
        let depth = self.current_depth()?;
        let mut level = Vec::new();
        while self.current_depth() == Some(depth) {
            if let Some(task) = self.pop() {
                level.push(task);
            }
        }
        Some((depth, level))
    }

    /// Drop everything still queued, returning how many tasks were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.queue.len();
        self.queue.clear();
        self.pending.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visited_insert_reports_new_entries() {
        let mut visited = VisitedSet::new();
        assert!(visited.insert("https://example.com/"));
        assert!(!visited.insert("https://example.com/"));
        assert!(visited.contains("https://example.com/"));
        assert!(!visited.contains("https://example.com/about"));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_claim_sequence_and_cap() {
        let mut visited = VisitedSet::new();
        assert_eq!(visited.claim("https://example.com/", 2), Admission::Fresh(1));
        assert_eq!(visited.claim("https://example.com/", 2), Admission::Duplicate);
        assert_eq!(visited.claim("https://example.com/a", 2), Admission::Fresh(2));
        assert_eq!(visited.claim("https://example.com/b", 2), Admission::CapReached);
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_frontier_is_fifo_by_depth() {
        let mut frontier = Frontier::seeded("s");
        assert!(frontier.push(CrawlTask::new("a", 1)));
        assert!(frontier.push(CrawlTask::new("b", 1)));
        assert!(frontier.push(CrawlTask::new("c", 2)));

        assert_eq!(frontier.pop(), Some(CrawlTask::new("s", 0)));
        assert_eq!(frontier.pop(), Some(CrawlTask::new("a", 1)));
        assert_eq!(frontier.pop(), Some(CrawlTask::new("b", 1)));
        assert_eq!(frontier.pop(), Some(CrawlTask::new("c", 2)));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn test_frontier_rejects_shallower_push_and_pending_duplicates() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(CrawlTask::new("a", 2)));
        assert!(!frontier.push(CrawlTask::new("b", 1)));
        assert!(!frontier.push(CrawlTask::new("a", 2)));
        assert_eq!(frontier.len(), 1);

        // Once popped, the same URL may be queued again; the visited set is
        // what stops a second visit.
        frontier.pop();
        assert!(frontier.push(CrawlTask::new("a", 3)));
    }

    #[test]
    fn test_next_level_takes_one_depth() {
        let mut frontier = Frontier::new();
        frontier.push(CrawlTask::new("a", 1));
        frontier.push(CrawlTask::new("b", 1));
        frontier.push(CrawlTask::new("c", 2));

        let (depth, level) = frontier.next_level().unwrap();
        assert_eq!(depth, 1);
        assert_eq!(level, vec![CrawlTask::new("a", 1), CrawlTask::new("b", 1)]);

        let (depth, level) = frontier.next_level().unwrap();
        assert_eq!(depth, 2);
        assert_eq!(level.len(), 1);
        assert!(frontier.next_level().is_none());
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut frontier = Frontier::seeded("s");
        frontier.push(CrawlTask::new("a", 1));
        assert_eq!(frontier.clear(), 2);
        assert!(frontier.is_empty());
        assert!(frontier.push(CrawlTask::new("s", 0)));
    }
}
