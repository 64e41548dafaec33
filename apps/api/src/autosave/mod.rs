//! Autosave core: change detection, debouncing and the save state machine.
//!
//! Nothing here performs I/O on its own. Saves go through a
//! [`gateway::PersistenceGateway`] supplied by the caller.

pub mod change_detector;
pub mod coordinator;
pub mod debounce;
pub mod gateway;

pub use coordinator::{AutosaveCoordinator, AutosaveStatus, SaveAttempt, SaveOutcome, SaveState};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use gateway::{GatewayError, PersistenceGateway, SavePayload, SaveReceipt};
