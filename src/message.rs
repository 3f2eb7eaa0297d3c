use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Slot,
    Artifact,
}

impl Resource {
    pub fn counterpart(self) -> Self {
        match self {
            Resource::Slot => Resource::Artifact,
            Resource::Artifact => Resource::Slot,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Slot => "slot",
            Resource::Artifact => "artifact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Request,
    Ack,
    Consume,
    Produce,
}

// the sending rank is supplied by the mesh, not the payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub kind: MessageKind,
    pub resource: Resource,
    pub ts: u64,
}

// first frame on every connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hello {
    pub rank: usize,
}

impl ProtocolMessage {
    pub fn to_json_string(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_string(token: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::from_str::<Self>(token)?)
    }
}

impl Hello {
    pub fn to_json_string(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_string(token: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::from_str::<Self>(token)?)
    }
}
