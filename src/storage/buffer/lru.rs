use super::replacer::Replacer;
use crate::storage::page::PageId;
use linked_hash_map::LinkedHashMap;

#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Access order, least recently used at the front.
    order: LinkedHashMap<PageId, ()>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        if self.order.get_refresh(&page_id).is_none() {
            self.order.insert(page_id, ());
        }
    }

    fn remove(&mut self, page_id: &PageId) {
        self.order.remove(page_id);
    }

    fn victim(&self, prefer: &dyn Fn(&PageId) -> bool) -> Option<PageId> {
        self.order
            .keys()
            .find(|page_id| prefer(*page_id))
            .or_else(|| self.order.front().map(|(page_id, _)| page_id))
            .copied()
    }

    fn size(&self) -> usize {
        self.order.len()
    }
}
