//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge: the
//! message model, the record decoder, delivery policy, and the seams to
//! external collaborators (remote session, transformers).
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Message Model
//! - A `Message` is one complete transmission, as ordered raw lines
//! - Only the header record is ever decoded by the pipeline itself

mod bridge_config;
mod delivery;
mod error;
mod message;
pub mod record;
mod session;
mod transformer;

pub use bridge_config::*;
pub use delivery::*;
pub use error::*;
pub use message::Message;
pub use record::{decode_line, DecodedLine, Field, Record};
pub use session::{RemoteSession, SessionFactory, SessionFuture};
pub use transformer::Transformer;
