pub mod gemini;

pub use gemini::GeminiClient;

/// Default Generative Language API endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
