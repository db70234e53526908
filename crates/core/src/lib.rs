pub mod config;
pub mod domain;
pub mod errors;

pub use domain::conversation::{ConversationKey, ConversationState, PendingQuestion};
pub use domain::credentials::{CredentialParseError, ServicePrincipalCredentials};
pub use domain::intent::{Classification, Entity, IntentLabel, RankedIntent};
pub use errors::{ClassifyError, LookupError};
