use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Remove => f.write_str("remove"),
        }
    }
}

/// One change to the set of known endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointUpdate {
    pub op: Operation,
    pub addr: String,
}

impl EndpointUpdate {
    pub fn add(addr: impl Into<String>) -> Self {
        Self {
            op: Operation::Add,
            addr: addr.into(),
        }
    }

    pub fn remove(addr: impl Into<String>) -> Self {
        Self {
            op: Operation::Remove,
            addr: addr.into(),
        }
    }
}

impl fmt::Display for EndpointUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.addr)
    }
}
