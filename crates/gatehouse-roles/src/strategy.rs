//! Batch load strategy selection.

/// How a batch of identities is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStrategy {
    /// One scan over every group, filtered client-side.
    Bulk,
    /// One lookup per identity.
    FanOut,
}

impl LoadStrategy {
    /// Pick the strategy for a batch.
    ///
    /// Bulk is chosen only when the batch is strictly larger than
    /// `threshold` and the schema lets groups be scanned for their members.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_roles::LoadStrategy;
    ///
    /// assert_eq!(LoadStrategy::choose(500, 100, true), LoadStrategy::Bulk);
    /// assert_eq!(LoadStrategy::choose(500, 100, false), LoadStrategy::FanOut);
    /// assert_eq!(LoadStrategy::choose(100, 100, true), LoadStrategy::FanOut);
    /// ```
    pub fn choose(identity_count: usize, threshold: usize, bulk_capable: bool) -> Self {
        if identity_count > threshold && bulk_capable {
            LoadStrategy::Bulk
        } else {
            LoadStrategy::FanOut
        }
    }

    /// Get the string representation of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::Bulk => "bulk",
            LoadStrategy::FanOut => "fan_out",
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
