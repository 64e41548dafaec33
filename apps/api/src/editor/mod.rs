//! Editor runtime: a session task that drives autosave for one open resume.

pub mod http_gateway;
pub mod location;
pub mod session;

pub use http_gateway::HttpGateway;
pub use location::{EditorLocation, EditorStep};
pub use session::{EditorHandle, EditorSession, SessionConfig, Toast, ToastAction, ToastEvent};
