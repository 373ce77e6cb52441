//! Session gate: the only writer of the credential slot.
//!
//! State machine:
//!
//! ```text
//! Unauthenticated ──verify──▶ Pending ──ok──▶ Authenticated
//!                               │                 │
//!                               └──fail──▶ Unauthenticated ◀── logout / rejection
//! ```
//!
//! Decisions (`guard`, `login`, `register`) are returned as values; the
//! caller performs the navigation.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::backend::{AuthBackend, BackendError};
use super::credential::{CapabilityToken, Identity};
use super::store::CredentialSlot;
use super::validate::{
    LoginError, RegisterError, RegistrationForm, classify_register_failure, validate_registration,
};
use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    /// A `verify` call is in flight.
    Pending,
    Authenticated(Identity),
}

/// An operation that needs a live credential before any backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectedAction {
    /// Start a session on an external game service, e.g. `fogchess`.
    StartGame(String),
}

impl ProtectedAction {
    pub fn start_game(name: impl Into<String>) -> Self {
        Self::StartGame(name.into())
    }

    /// Name the backend mints capabilities under.
    pub fn capability_name(&self) -> &str {
        match self {
            Self::StartGame(name) => name,
        }
    }
}

/// What the caller should do after [`SessionGate::guard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed(CapabilityToken),
    /// Navigate here instead; the credential has been purged if there was one.
    Redirect(String),
    /// The action failed without the current credential being refused:
    /// either the response was unusable or the credential was replaced
    /// mid-call. Carries a message key; no retry, credential kept.
    Failed(&'static str),
}

impl GuardDecision {
    pub fn proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            Self::Redirect(path) => Some(path),
            _ => None,
        }
    }

    pub fn capability(&self) -> Option<&CapabilityToken> {
        match self {
            Self::Proceed(cap) => Some(cap),
            _ => None,
        }
    }
}

/// Result of a remote credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub identity: Option<Identity>,
}

pub const FAILED_TO_START_GAME: &str = "home.failedToStartGame";

pub fn home_path(locale: &Locale) -> String {
    format!("/{locale}")
}

pub fn login_path(locale: &Locale) -> String {
    format!("/{locale}/login")
}

/// Where a successful registration lands.
pub fn registered_path(locale: &Locale) -> String {
    format!("/{locale}/login?registered=true")
}

pub struct SessionGate {
    slot: CredentialSlot,
    backend: Arc<dyn AuthBackend>,
    state: Mutex<GateState>,
}

impl SessionGate {
    pub fn new(slot: CredentialSlot, backend: Arc<dyn AuthBackend>) -> Self {
        Self { slot, backend, state: Mutex::new(GateState::Unauthenticated) }
    }

    pub fn state(&self) -> GateState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Identity cached by the last successful `verify`.
    pub fn identity(&self) -> Option<Identity> {
        match self.state() {
            GateState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Local presence check. Never proof of validity.
    pub fn is_authenticated(&self) -> bool {
        self.slot.is_present()
    }

    /// Confirm the stored credential with the backend.
    ///
    /// Any failure purges the slot, unless the slot was replaced while the
    /// call was in flight. Dropping the future before it resolves discards
    /// the result and restores the previous state.
    pub async fn verify(&self) -> Verification {
        let Some(credential) = self.slot.load() else {
            self.set_state(GateState::Unauthenticated);
            return Verification { valid: false, identity: None };
        };

        let pending = PendingGuard::enter(&self.state);
        let outcome = self.backend.verify(credential.token()).await;

        match outcome {
            Ok(identity) => {
                // A logout or re-login while we waited wins over this result.
                if !self.holds(credential.token()) {
                    debug!("credential changed during verify; discarding result");
                    pending.commit(GateState::Unauthenticated);
                    return Verification { valid: false, identity: None };
                }
                debug!(username = %identity.username, "credential verified");
                pending.commit(GateState::Authenticated(identity.clone()));
                Verification { valid: true, identity: Some(identity) }
            }
            Err(e) => {
                if self.holds(credential.token()) {
                    info!(error = %e, "credential rejected; purging");
                    self.purge();
                } else {
                    debug!(error = %e, "superseded credential rejected; slot kept");
                }
                pending.commit(GateState::Unauthenticated);
                Verification { valid: false, identity: None }
            }
        }
    }

    /// Decide whether `action` may proceed for a user browsing in `locale`.
    pub async fn guard(&self, action: &ProtectedAction, locale: &Locale) -> GuardDecision {
        let Some(credential) = self.slot.load() else {
            debug!(action = action.capability_name(), "no credential; redirecting to login");
            return GuardDecision::Redirect(login_path(locale));
        };

        match self.backend.mint_capability(action.capability_name(), credential.token()).await {
            Ok(cap) => {
                info!(action = action.capability_name(), "capability minted");
                GuardDecision::Proceed(cap)
            }
            Err(BackendError::Decode(e)) => {
                warn!(action = action.capability_name(), error = %e, "capability response unusable");
                GuardDecision::Failed(FAILED_TO_START_GAME)
            }
            Err(e) => match self.slot.load() {
                Some(current) if current.token() != credential.token() => {
                    // Re-login while minting; the new credential was never refused.
                    debug!(action = action.capability_name(), error = %e, "superseded credential refused");
                    GuardDecision::Failed(FAILED_TO_START_GAME)
                }
                Some(_) => {
                    info!(action = action.capability_name(), error = %e, "action refused; purging credential");
                    self.purge();
                    self.set_state(GateState::Unauthenticated);
                    GuardDecision::Redirect(login_path(locale))
                }
                None => {
                    debug!(action = action.capability_name(), error = %e, "logged out while minting");
                    GuardDecision::Redirect(login_path(locale))
                }
            },
        }
    }

    /// Exchange username/password for a credential and store it.
    /// Returns the path to navigate to on success.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        locale: &Locale,
    ) -> Result<String, LoginError> {
        let credential = self.backend.login(username, password).await?;
        self.slot.save(&credential).map_err(|e| LoginError::Store(e.to_string()))?;
        // Identity is unknown until the next verify.
        self.set_state(GateState::Unauthenticated);
        info!(%username, "logged in");
        Ok(home_path(locale))
    }

    /// Validate locally, then create the account. Does not log in.
    pub async fn register(
        &self,
        form: &RegistrationForm,
        locale: &Locale,
    ) -> Result<String, RegisterError> {
        let registration = validate_registration(form)?;
        self.backend
            .register(&registration)
            .await
            .map_err(classify_register_failure)?;
        info!(username = %registration.username, "registered");
        Ok(registered_path(locale))
    }

    /// Forget the credential and cached identity. No backend call; always succeeds.
    pub fn logout(&self) {
        self.purge();
        self.set_state(GateState::Unauthenticated);
        debug!("logged out");
    }

    /// `true` while the slot still holds `token`.
    fn holds(&self, token: &str) -> bool {
        self.slot.load().is_some_and(|current| current.token() == token)
    }

    fn purge(&self) {
        if let Err(e) = self.slot.purge() {
            warn!(error = %e, "failed to purge credential store");
        }
    }

    fn set_state(&self, next: GateState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Holds the gate in `Pending` until committed; reverts on drop otherwise.
struct PendingGuard<'a> {
    state: &'a Mutex<GateState>,
    previous: Option<GateState>,
}

impl<'a> PendingGuard<'a> {
    fn enter(state: &'a Mutex<GateState>) -> Self {
        let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *current, GateState::Pending);
        Self { state, previous: Some(previous) }
    }

    fn commit(mut self, next: GateState) {
        self.previous = None;
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = previous;
        }
    }
}
