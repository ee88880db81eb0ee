// Disha - adaptive learning and caching core for student pathway
// recommendations. Couples a tabular reinforcement-learning policy with a
// fingerprinted recommendation cache behind a small engine facade; the web
// layer, LLM generator, and data stores are external collaborators.

pub mod cache;
pub mod core;
pub mod engine;
pub mod error;
pub mod optimizer;
pub mod reinforcement;

pub use engine::{PathwayEngine, ProfileArchive, RecommendationGenerator, SystemInsights};
pub use error::{DishaError, DishaResult};

use anyhow::Result;
use tracing::info;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize the core with default settings
pub fn init() -> Result<()> {
    // Default to colored output for CLI usage
    init_with_logger(true)
}

/// Initialize the core with custom logger configuration
///
/// Pass `ansi_colors = false` when embedding in a host that parses the
/// process output (logs then go to stderr without formatting).
pub fn init_with_logger(ansi_colors: bool) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    if !ansi_colors {
        fmt::Subscriber::builder()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .without_time()
            .init();

        info!("Initializing disha core v{} (minimal log format)", version());
    } else {
        fmt::Subscriber::builder()
            .with_ansi(true)
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(true)
            .init();

        info!("Initializing disha core v{}", version());
    }

    Ok(())
}
