//! Unified error handling with Sentry integration.
//!
//! Each component has its own error enum; [`StorefrontError`] collects them
//! for front ends that drive several components. [`StorefrontError::report`]
//! captures unexpected failures to Sentry and logs them, and leaves
//! user-facing conditions (unknown email, empty cart) alone.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::context::ContextError;
use crate::orders::OrderError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Error type for anything the storefront client can fail at.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A store was used after its provider ended.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Checkout could not complete.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Order history could not be read.
    #[error(transparent)]
    Orders(#[from] OrderError),

    /// Backend API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad input from the user.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorefrontError {
    /// Whether the error is an expected outcome the user can act on.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::Session(err) => err.is_user_facing(),
            Self::Checkout(err) => err.is_user_facing(),
            Self::Orders(err) => err.is_user_facing(),
            Self::Api(ApiError::Status { status, .. }) => *status < 500,
            Self::InvalidInput(_) => true,
            Self::Config(_) | Self::Context(_) | Self::Api(_) | Self::Storage(_) => false,
        }
    }

    /// Log the error, capturing unexpected ones to Sentry.
    pub fn report(&self) {
        if self.is_user_facing() {
            tracing::warn!(error = %self, "Operation failed");
        } else {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context for the logged-in customer.
///
/// Call this after a successful login or registration to associate errors
/// with the customer.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error. Without an initialized Sentry client this is a
/// no-op.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
