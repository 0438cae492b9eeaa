//! Concrete provider implementations
//!
//! - `geocode`: Google Geocoding API (structured tier)
//! - `openai`: hosted chat completion (cloud model tier)
//! - `ollama`: local model command (last-resort tier)

pub mod geocode;
pub mod ollama;
pub mod openai;

pub use geocode::GoogleGeocodeClient;
pub use ollama::OllamaCli;
pub use openai::OpenAIClient;
