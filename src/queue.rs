use crate::message::Resource;
use std::collections::HashSet;
use std::fmt;

// ordered by (ts, rank), rank breaking ties; every honest process
// agrees on this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    pub ts: u64,
    pub rank: usize,
}

// the first `available` positions of `req` form the grant window:
// peers inside it get exactly one grant per request
pub struct ResourceQueue {
    resource: Resource,
    available: usize,
    req: Vec<Entry>,
    ack_sent: HashSet<usize>,
}

impl ResourceQueue {
    pub fn new(resource: Resource, available: usize) -> Self {
        Self {
            resource,
            available,
            req: Vec::new(),
            ack_sent: HashSet::new(),
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn available(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.req.is_empty()
    }

    pub fn ack_sent(&self, rank: usize) -> bool {
        self.ack_sent.contains(&rank)
    }

    pub fn add_request(&mut self, rank: usize, ts: u64) -> bool {
        assert!(
            !self.req.iter().any(|e| e.rank == rank),
            "duplicate REQUEST from rank {}: {}", rank, self
        );
        let entry = Entry { ts, rank };
        let pos = self.req.partition_point(|e| *e < entry);
        self.req.insert(pos, entry);
        self.check();
        pos < self.available
    }

    pub fn consume(&mut self, rank: usize) {
        let pos = self
            .req
            .iter()
            .position(|e| e.rank == rank)
            .unwrap_or_else(|| panic!("CONSUME from rank {} with no pending REQUEST: {}", rank, self));
        assert!(
            pos < self.available,
            "CONSUME from rank {} outside the grant window: {}", rank, self
        );
        assert!(
            self.ack_sent.remove(&rank),
            "CONSUME from rank {} that was never granted: {}", rank, self
        );
        self.req.remove(pos);
        self.available -= 1;
        self.check();
    }

    // returns the rank the widened window now reaches, unless that
    // request was already granted
    pub fn produce(&mut self) -> Option<usize> {
        self.available += 1;
        self.req
            .get(self.available - 1)
            .map(|e| e.rank)
            .filter(|rank| !self.ack_sent.contains(rank))
    }

    pub fn mark_ack_sent(&mut self, rank: usize) {
        assert!(
            self.ack_sent.insert(rank),
            "grant for rank {} recorded twice: {}", rank, self
        );
        self.check();
    }

    fn check(&self) {
        debug_assert!(
            self.req.windows(2).all(|w| w[0] < w[1]),
            "request queue out of order: {}", self
        );
        debug_assert!(
            self.ack_sent.iter().all(|r| self.req.iter().any(|e| e.rank == *r)),
            "grant recorded for a rank with no pending request: {}", self
        );
    }
}

impl fmt::Display for ResourceQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} avail={}]", self.resource.name(), self.available)?;
        for (pos, entry) in self.req.iter().enumerate() {
            let granted = if self.ack_sent.contains(&entry.rank) { "*" } else { "" };
            if pos == self.available {
                write!(f, " |")?;
            }
            write!(f, " {}@{}{}", entry.rank, entry.ts, granted)?;
        }
        Ok(())
    }
}
