use crate::update::{EndpointUpdate, Operation};

/// Known endpoints in announcement order, fed by watcher batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<String>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint; returns false if it was already known.
    pub fn add(&mut self, addr: &str) -> bool {
        if self.contains(addr) {
            return false;
        }
        self.endpoints.push(addr.to_string());
        true
    }

    /// Removes an endpoint; returns false if it was not known.
    pub fn remove(&mut self, addr: &str) -> bool {
        let before = self.endpoints.len();
        self.endpoints.retain(|known| known != addr);
        self.endpoints.len() != before
    }

    /// Applies a batch and returns how many updates changed the set.
    pub fn apply(&mut self, updates: &[EndpointUpdate]) -> usize {
        updates
            .iter()
            .filter(|update| match update.op {
                Operation::Add => self.add(&update.addr),
                Operation::Remove => self.remove(&update.addr),
            })
            .count()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.endpoints.iter().any(|known| known == addr)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}
