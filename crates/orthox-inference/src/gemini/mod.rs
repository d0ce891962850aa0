//! Gemini generative-language backend.
//!
//! One [`GeminiBackend`] is built at startup and shared by the vision,
//! general reasoning, classification, grounded-advice and outcome adapters.
//!
//! # Example
//!
//! ```rust,no_run
//! use orthox_core::Capability;
//! use orthox_inference::gemini::{GeminiBackend, GeminiConfig, GenerateRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiBackend::new(GeminiConfig::from_env()).unwrap();
//!     let request = GenerateRequest::text(&backend.config().reasoning_model, "Hello");
//!     let generation = backend.generate(Capability::Reasoning, request).await.unwrap();
//!     println!("{}", generation.text);
//! }
//! ```

mod backend;
pub mod error;
pub mod types;

pub use backend::{
    extract_sources, media_part, parse_generation, GeminiBackend, GeminiConfig, GenerateRequest,
    Generation, GroundingTool,
};
pub use error::GeminiErrorCode;
