//! Registry of managed channels, partitioned by visibility.

use crate::event::{ChannelKind, ChannelRecord};

/// Public/private channel listing kept in sync with `channel:created` and
/// `channel:deleted` events.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    public: Vec<ChannelRecord>,
    private: Vec<ChannelRecord>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a newly created channel to its partition.
    pub fn insert(&mut self, record: ChannelRecord) {
        match record.kind {
            ChannelKind::Public => self.public.insert(0, record),
            ChannelKind::Private => self.private.insert(0, record),
        }
    }

    /// Remove a channel by id from both partitions.
    ///
    /// Removal is unconditional and idempotent: deleting an id that isn't
    /// tracked (or that arrives before its create) is a no-op. Returns
    /// whether anything was removed.
    pub fn remove(&mut self, channel_id: i64) -> bool {
        let before = self.public.len() + self.private.len();
        self.public.retain(|c| c.channel_id != channel_id);
        self.private.retain(|c| c.channel_id != channel_id);
        self.public.len() + self.private.len() != before
    }

    /// Replace both partitions wholesale from the listing endpoint.
    pub fn load(&mut self, public: Vec<ChannelRecord>, private: Vec<ChannelRecord>) {
        self.public = public;
        self.private = private;
    }

    #[must_use]
    pub fn public(&self) -> &[ChannelRecord] {
        &self.public
    }

    #[must_use]
    pub fn private(&self) -> &[ChannelRecord] {
        &self.private
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.public.len() + self.private.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }
}
