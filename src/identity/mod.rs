//! Session and identity management for the API client.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
mod session;
mod provider;

pub use principal::Identity;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, CREDENTIAL_KEY};
pub use session::{IdentityResolver, Session, SessionStatus, SessionStore};
pub use provider::{AuthGateway, LoginRequest, ProfileUpdate, RegisterRequest, MIN_PASSWORD_LEN};
