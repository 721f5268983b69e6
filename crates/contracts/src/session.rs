//! RemoteSession trait - remote system of record
//!
//! One session serves exactly one delivery; sessions are never shared between
//! concurrent deliveries.

use std::future::Future;
use std::pin::Pin;

use crate::{ContractError, PushPayload, PushResponse};

/// Boxed future returned by session calls
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authenticated client of the remote system
///
/// Object safe, so sinks hold `Box<dyn RemoteSession>` regardless of transport.
pub trait RemoteSession: Send {
    /// (Re-)authenticate against the remote
    ///
    /// Returns false on any failure; implementations log the cause.
    fn authenticate(&mut self) -> SessionFuture<'_, bool>;

    /// Push a payload to `endpoint`
    ///
    /// # Errors
    /// Transport or decoding failure. A decoded rejection is `Ok` with
    /// `success == false`.
    fn push<'a>(
        &'a mut self,
        endpoint: &'a str,
        payload: &'a PushPayload,
    ) -> SessionFuture<'a, Result<PushResponse, ContractError>>;
}

/// Opens a fresh session per delivery
pub trait SessionFactory: Send + Sync {
    /// # Errors
    /// The session's transport could not be set up
    fn open(&self) -> Result<Box<dyn RemoteSession>, ContractError>;
}
