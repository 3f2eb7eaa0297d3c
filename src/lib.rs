pub mod clock;
pub mod config;
pub mod crafter;
pub mod dwell;
pub mod fsm;
pub mod log;
pub mod mesh;
pub mod message;
pub mod queue;
pub mod role;
pub mod tally;

pub use crate::crafter::Crafter;
pub use crate::mesh::Mesh;
pub use crate::message::{MessageKind, ProtocolMessage, Resource};
