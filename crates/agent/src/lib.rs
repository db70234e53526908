//! Dialog engine: intent routing and the multi-turn question machine.
//!
//! One inbound message flows through here as follows:
//!
//! ```text
//! text → DialogStateMachine ── pending question? ──> resume handler
//!              │                                        (CredentialParser → lookup)
//!              └── fresh ──> IntentClassifier → resolve() → Action
//!                                                   │
//!                                    ResourceDirectory + renderers
//! ```
//!
//! The machine returns `(new_state, reply_text)`; persisting the state and
//! delivering the reply are the caller's concern. Every failure mode folds
//! into reply text; nothing in this crate is fatal to the process.

pub mod classify;
pub mod dialog;
pub mod directory;
pub mod resolve;

pub use classify::{IntentClassifier, LuisClassifier, StaticClassifier};
pub use dialog::DialogStateMachine;
pub use directory::{
    render_resource_groups, render_subscriptions, ArmDirectory, ResourceDirectory, ResourceGroup,
    RestProxyDirectory, StaticDirectory, Subscription,
};
pub use resolve::{resolve, Action};
