//! Unified error types for perfwatch
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from a notification channel
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Error from the alert engine
    #[error("Alert engine error: {0}")]
    Engine(#[from] EngineError),

    /// Error from the host sampler
    #[error("Sampler error: {0}")]
    Sampler(#[from] SamplerError),

    /// Named channel is not configured
    #[error("Notification channel not found: {0}")]
    ChannelNotFound(String),

    /// `check` found invalid settings or rejected keys
    #[error("Configuration check failed with {0} problem(s)")]
    CheckFailed(usize),

    /// Failed to install the Ctrl+C handler
    #[error("Failed to set signal handler: {0}")]
    Signal(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Failed to parse config file
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required config field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors from notification delivery and channel management
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No credential installed on the channel
    #[error("No channel key configured")]
    MissingKey,

    /// Remote service rejected the credential
    #[error("Channel key rejected by remote service")]
    KeyRejected,

    /// Device id is not known to the channel
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Remote answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Network or client failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local output failure (terminal channel)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from host-facing alert engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No definition registered under this id
    #[error("Unknown alert definition: {0}")]
    UnknownDefinition(String),

    /// A definition with this id is already registered
    #[error("Duplicate alert definition: {0}")]
    DuplicateDefinition(String),
}

/// Errors from the host sampler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    /// The OS reported no memory total, so a percentage cannot be formed
    #[error("Memory statistics unavailable")]
    MemoryUnavailable,

    /// The sample channel was closed by the consumer
    #[error("Sample channel closed")]
    ChannelClosed,
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
