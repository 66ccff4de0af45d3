//! Shared types, error model, and configuration for Mriynyk.
//!
//! This crate is the foundation depended on by all other Mriynyk crates.
//! It provides:
//! - [`MriynykError`]: the unified error type
//! - Domain types ([`Grade`], [`Discipline`], [`Topic`], [`Page`], [`Workbook`])
//! - Configuration ([`AppConfig`], config loading, secret resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CorpusConfig, PipelineConfig, ProviderConfig, ResolveStrategy, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    resolve_database_path, validate_config,
};
pub use error::{ErrorKind, MriynykError, Result};
pub use types::{
    Discipline, EmbeddingVector, Grade, Page, QuizQuestion, Topic, TopicRequest, TopicResponse,
    Workbook,
};
