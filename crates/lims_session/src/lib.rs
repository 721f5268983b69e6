//! # LIMS Session
//!
//! Remote system-of-record clients.
//!
//! Responsibilities:
//! - Talk to the SENAITE JSON API (authenticate, push)
//! - Open one fresh session per delivery
//! - Provide a scripted mock session for tests

pub mod error;
pub mod mock_session;
pub mod senaite;

pub use contracts::{RemoteSession, SessionFactory};
pub use error::{Result, SessionError};
pub use mock_session::{MockCalls, MockConfig, MockSession, MockSessionFactory};
pub use senaite::{SenaiteSession, SenaiteSessionFactory, API_PATH};
