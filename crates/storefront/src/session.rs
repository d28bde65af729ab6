//! Customer session state.
//!
//! The session records which customer, if any, is logged in on this device.
//!
//! **Login is an email lookup, not authentication.** `login` searches the
//! customer directory and accepts the first record whose email matches,
//! ignoring case. No credential is checked. This is a placeholder suitable for
//! a demo storefront only.
//!
//! # Overlapping calls
//!
//! `is_loading` is advisory: the store does not block a second `login`,
//! `register` or `update_profile` while one is in flight. When calls overlap,
//! whichever response resolves last determines the final state. Storage
//! writes are queued while the state lock is held, so the stored entry
//! always ends up matching the final in-memory state.
//!
//! Once the owning provider has shut down, every change is rejected with
//! [`ContextError::OutsideProvider`] and logged as an error.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use shop_smart_core::{Customer, CustomerUpdate, NewCustomer};

use crate::api::{ApiError, CustomerDirectory};
use crate::context::ContextError;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::persistence::Persister;
use crate::storage::{CUSTOMER_KEY, KeyValueStorage, load_json};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const UPDATE_FAILED: &str = "Profile update failed";

/// Errors from session operations.
///
/// `Display` is the message mirrored into [`SessionState::error`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// No directory record matches the email.
    #[error("Customer not found. Please register first.")]
    CustomerNotFound,

    /// The operation needs a logged-in customer.
    #[error("No customer logged in")]
    NoActiveSession,

    /// The customer directory call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The store's provider has shut down.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl SessionError {
    /// Whether the error is an expected outcome the user can act on.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::CustomerNotFound | Self::NoActiveSession => true,
            Self::Api(ApiError::Status { status, .. }) => *status < 500,
            Self::Api(_) | Self::Context(_) => false,
        }
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    customer: Option<Customer>,
    is_loading: bool,
    error: Option<String>,
}

impl SessionState {
    fn restored(customer: Option<Customer>) -> Self {
        Self {
            customer,
            ..Self::default()
        }
    }

    /// The logged-in customer.
    #[must_use]
    pub const fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// True iff a customer is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.customer.is_some()
    }

    /// True while a directory call is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message from the last failed operation.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// The application's customer session.
pub struct SessionStore {
    state: RwLock<SessionState>,
    directory: Arc<dyn CustomerDirectory>,
    persister: Persister,
}

impl SessionStore {
    /// Restore the session from storage, failing open to logged out.
    pub fn load(
        storage: &dyn KeyValueStorage,
        directory: Arc<dyn CustomerDirectory>,
        persister: Persister,
    ) -> Self {
        let customer: Option<Customer> = load_json(storage, CUSTOMER_KEY);
        if let Some(customer) = &customer {
            info!(customer_id = %customer.id, "Session restored");
            set_sentry_user(&customer.id, Some(customer.email.as_str()));
        }

        Self {
            state: RwLock::new(SessionState::restored(customer)),
            directory,
            persister,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// `OutsideProvider`, with an error logged, if the provider has shut
    /// down.
    fn ensure_live(&self, op: &str) -> Result<(), SessionError> {
        if self.persister.is_closed() {
            let e = ContextError::OutsideProvider { store: "session" };
            error!(op, error = %e, "Session change rejected");
            return Err(e.into());
        }
        Ok(())
    }

    /// Mark an operation as started.
    fn begin(&self, op: &str) -> Result<(), SessionError> {
        self.ensure_live(op)?;
        let mut state = self.write();
        state.is_loading = true;
        state.error = None;
        Ok(())
    }

    /// Settle an operation: adopt the customer on success, record the
    /// message on failure. Either way loading ends.
    ///
    /// A response that arrives after the provider shut down is discarded.
    fn settle(
        &self,
        op: &str,
        result: Result<Customer, SessionError>,
        fallback: &str,
    ) -> Result<Customer, SessionError> {
        if let Err(e) = self.ensure_live(op) {
            self.write().is_loading = false;
            return Err(e);
        }
        match result {
            Ok(customer) => {
                let mut state = self.write();
                state.customer = Some(customer.clone());
                state.is_loading = false;
                state.error = None;
                self.persister.save(CUSTOMER_KEY, &customer);
                drop(state);
                set_sentry_user(&customer.id, Some(customer.email.as_str()));
                Ok(customer)
            }
            Err(err) => {
                let message = err.to_string();
                let message = if message.trim().is_empty() {
                    fallback.to_string()
                } else {
                    message
                };
                warn!(error = %message, "Session operation failed");
                let mut state = self.write();
                state.is_loading = false;
                state.error = Some(message);
                Err(err)
            }
        }
    }

    /// Log in as the directory customer whose email matches, ignoring case.
    ///
    /// On failure the previous session, if any, is kept.
    ///
    /// # Errors
    ///
    /// `CustomerNotFound` if no record matches, `Api` if the directory call
    /// fails. The message is also stored in `error`. `Context` if the
    /// provider has shut down.
    #[instrument(skip(self))]
    pub async fn login(&self, email: &str) -> Result<Customer, SessionError> {
        self.begin("login")?;
        let result = self.find_by_email(email).await;
        let result = self.settle("login", result, LOGIN_FAILED);
        if let Ok(customer) = &result {
            info!(customer_id = %customer.id, "Logged in");
        }
        result
    }

    async fn find_by_email(&self, email: &str) -> Result<Customer, SessionError> {
        let candidates = self.directory.search(email.trim()).await?;
        debug!(candidates = candidates.len(), "Directory search returned");
        candidates
            .into_iter()
            .find(|c| c.email.matches_ignore_case(email))
            .ok_or(SessionError::CustomerNotFound)
    }

    /// Create a customer and log in as them.
    ///
    /// On failure the previous session, if any, is kept.
    ///
    /// # Errors
    ///
    /// `Api` if the directory rejects the record or cannot be reached,
    /// `Context` if the provider has shut down.
    #[instrument(skip(self, customer), fields(email = %customer.email))]
    pub async fn register(&self, customer: &NewCustomer) -> Result<Customer, SessionError> {
        self.begin("register")?;
        let result = self
            .directory
            .create(customer)
            .await
            .map_err(SessionError::from);
        let result = self.settle("register", result, REGISTRATION_FAILED);
        if let Ok(customer) = &result {
            info!(customer_id = %customer.id, "Registered");
        }
        result
    }

    /// Send a partial profile update and adopt the server's record.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if nobody is logged in; state is left untouched in
    /// that case. `Api` if the directory call fails, `Context` if the
    /// provider has shut down.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &CustomerUpdate) -> Result<Customer, SessionError> {
        self.ensure_live("update_profile")?;
        let id = self
            .read()
            .customer
            .as_ref()
            .map(|c| c.id)
            .ok_or(SessionError::NoActiveSession)?;

        self.begin("update_profile")?;
        let result = self
            .directory
            .update(id, update)
            .await
            .map_err(SessionError::from);
        let result = self.settle("update_profile", result, UPDATE_FAILED);
        if result.is_ok() {
            info!(customer_id = %id, "Profile updated");
        }
        result
    }

    /// Log out. Synchronous, no network call.
    pub fn logout(&self) {
        if self.ensure_live("logout").is_err() {
            return;
        }
        let previous = {
            let mut state = self.write();
            let previous = std::mem::take(&mut *state).customer;
            self.persister.remove(CUSTOMER_KEY);
            previous
        };
        clear_sentry_user();
        if let Some(customer) = previous {
            info!(customer_id = %customer.id, "Logged out");
        }
    }

    /// Clear the last error only.
    pub fn clear_error(&self) {
        if self.ensure_live("clear_error").is_ok() {
            self.write().error = None;
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    /// The logged-in customer.
    #[must_use]
    pub fn customer(&self) -> Option<Customer> {
        self.read().customer.clone()
    }

    /// Whether a customer is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Whether a directory call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    /// Message from the last failed operation.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }
}
