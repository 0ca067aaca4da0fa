use crate::storage::page::PageId;
use std::fmt::Debug;

/// Replacement policy over cached page ids.
pub trait Replacer: Send + Sync + Debug {
    /// Record a use of `page_id`, making it the most recently used.
    fn record_access(&mut self, page_id: PageId);

    /// Stop tracking `page_id`.
    fn remove(&mut self, page_id: &PageId);

    /// Choose a page to evict without removing it.
    ///
    /// Returns the first page in replacement order for which `prefer` holds,
    /// otherwise the first page overall. `None` only when nothing is tracked.
    fn victim(&self, prefer: &dyn Fn(&PageId) -> bool) -> Option<PageId>;

    /// Number of tracked pages.
    fn size(&self) -> usize;
}
