mod error;
mod profile;
pub mod saml;
mod saml_registry;
mod session;
pub mod session_store;

pub use error::{AuthError, ErrorInfo, ErrorResponse, PLEASE_LOGIN};
pub use profile::SessionProfile;
pub use saml::{SamlAssertion, SamlError, SamlStrategy};
pub use saml_registry::{IdpRegistry, RegistryError};
pub use session::SessionManager;
pub use session_store::{
    CacheSessionStore, MemorySessionStore, SessionError, SessionRecord, SessionStore,
    SharedSessionStore, create_session_store,
};
