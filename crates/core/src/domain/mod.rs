pub mod conversation;
pub mod credentials;
pub mod intent;
