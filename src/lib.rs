pub mod api;
pub mod config;
pub mod gemini;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod wordpress;

pub use api::{create_router, AppState};
pub use config::Config;
pub use gemini::{AiClient, GeminiBackend, GenerativeBackend};
pub use pipeline::GenerationPipeline;
pub use store::PostStore;
pub use types::*;
pub use wordpress::{Publisher, WordPressClient};
