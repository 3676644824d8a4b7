pub const DEFAULT_DEDUP_CAPACITY: usize = 20;

/// Bounded FIFO memory of recently seen message ids.
///
/// Backed by a fixed ring: once full, each new id overwrites the oldest slot.
#[derive(Debug, Clone)]
pub struct DuplicateCache {
    ids: Vec<u32>,
    head: usize,
    capacity: usize,
}

impl Default for DuplicateCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

impl DuplicateCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn seen(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    /// Records `id`, evicting the oldest entry when full. Ids already present are left in place.
    pub fn record(&mut self, id: u32) {
        if self.seen(id) {
            return;
        }

        if self.ids.len() < self.capacity {
            self.ids.push(id);
        } else {
            self.ids[self.head] = id;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Returns `true` if `id` was new (and is now recorded), `false` for a duplicate.
    pub fn check_and_record(&mut self, id: u32) -> bool {
        if self.seen(id) {
            return false;
        }
        self.record(id);
        true
    }

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (newer, older) = self.ids.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
