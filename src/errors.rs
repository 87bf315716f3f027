//! Unified error type for the target commitment engine.

use thiserror::Error;

/// All errors raised by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or invalid input that is not tied to a single field
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Underlying `SeaORM` failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Category lookup failed
    #[error("Category not found: {id}")]
    CategoryNotFound {
        /// Category id or code that was requested
        id: String,
    },

    /// Product lookup failed
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Product id or code that was requested
        id: String,
    },

    /// Actor lookup failed
    #[error("Actor not found: {id}")]
    ActorNotFound {
        /// Actor id or code that was requested
        id: String,
    },

    /// Month key outside the fiscal calendar
    #[error("Invalid fiscal month: {key}")]
    InvalidMonth {
        /// The rejected key
        key: String,
    },

    /// A figure failed validation (negative, not finite, not allowed for this product)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// The rejected value, rendered for display
        value: String,
    },

    /// Status transition not permitted from the current status
    #[error("Cannot {action} a target that is {from}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Attempted action
        action: String,
    },

    /// Target values are locked in the current status
    #[error("Targets are locked while {status}")]
    NotEditable {
        /// Current status
        status: String,
    },

    /// The acting role may not perform the action on this target
    #[error("Role {role} is not permitted to {action}")]
    PermissionDenied {
        /// Role of the acting user
        role: String,
        /// Attempted action
        action: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
