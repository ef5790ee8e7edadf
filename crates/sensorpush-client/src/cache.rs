//! Cache cell for device listings.

/// A lazily-populated cache cell with an explicit invalidated state.
///
/// An empty-but-successful listing counts as populated; only
/// [`CacheEntry::invalidate`] sends the cell back to the network. A
/// failed fetch leaves the cell as it was, so the next access retries.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CacheEntry<T> {
    /// Never fetched.
    #[default]
    Unpopulated,
    /// Holds the last successful fetch, possibly empty.
    Populated(T),
    /// Explicitly cleared; the next access must refetch.
    Invalidated,
}

impl<T> CacheEntry<T> {
    /// Whether the next access should hit the network.
    pub fn needs_fetch(&self) -> bool {
        !matches!(self, CacheEntry::Populated(_))
    }

    /// Store a successful fetch result.
    pub fn populate(&mut self, value: T) {
        *self = CacheEntry::Populated(value);
    }

    /// Clear the cell so the next access refetches.
    pub fn invalidate(&mut self) {
        *self = CacheEntry::Invalidated;
    }

    /// The cached value, if populated.
    pub fn value(&self) -> Option<&T> {
        match self {
            CacheEntry::Populated(value) => Some(value),
            _ => None,
        }
    }
}
