pub mod autosave;
pub mod config;
pub mod db;
pub mod editor;
pub mod errors;
pub mod generation;
pub mod llm_client;
pub mod models;
pub mod resume;
pub mod routes;
pub mod state;
