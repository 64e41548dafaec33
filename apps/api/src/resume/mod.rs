// Resume persistence: PostgreSQL rows, photo storage and the HTTP surface the
// editor autosaves through.

pub mod form;
pub mod handlers;
pub mod photos;
pub mod store;
