//! Application layer: the session + live-list synchronization lifecycle.
//!
//! This crate coordinates the capabilities defined in `roster-core`:
//!
//! - [`SessionService`] mirrors the auth capability's state into the local
//!   profile cache and publishes the derived [`roster_core::SessionState`].
//! - [`LiveQuery`] owns the single live subscription against the record
//!   collection and the snapshot-replaced record list.
//! - [`RecordGateway`] validates and appends new records.
//! - [`RosterUseCase`] wires the three together and drives the
//!   session-to-subscription state machine.

pub mod live_query;
pub mod record_gateway;
pub mod roster_usecase;
pub mod session_service;

pub use live_query::LiveQuery;
pub use record_gateway::RecordGateway;
pub use roster_usecase::RosterUseCase;
pub use session_service::SessionService;
