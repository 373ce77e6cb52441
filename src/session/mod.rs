//! Client-held session: credential storage, the auth backend seam and the
//! gate that guards protected actions.

pub mod backend;
pub mod credential;
pub mod gate;
pub mod store;
pub mod validate;

pub use backend::{AuthBackend, BackendError, HttpAuthBackend};
pub use credential::{CapabilityToken, Credential, Identity};
pub use gate::{GateState, GuardDecision, ProtectedAction, SessionGate};
pub use store::{CredentialSlot, FileStore, KeyValueStore, MemoryStore, StoreError};
pub use validate::{LoginError, RegisterError, RegistrationForm};
