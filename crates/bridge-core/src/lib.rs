pub mod bridge;
pub mod calls;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod orchestrator;
pub mod profiles;
pub mod requests;
pub mod safety;
pub mod store;
pub mod validation;

pub mod types;

pub use crate::bridge::{Bridge, CallSettings, RequestContext};
pub use crate::error::{BridgeError, ErrorKind};
pub use crate::store::Store;
