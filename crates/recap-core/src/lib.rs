pub mod chunk;
pub mod engine;
pub mod error;
pub mod http;
pub mod invoke;
pub mod registry;
pub mod summarize;
pub mod transcript;
pub mod types;

pub use error::*;
pub use registry::{EngineEntry, ModelRegistry};
pub use summarize::Summarizer;
pub use types::*;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
