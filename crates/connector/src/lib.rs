//! Channel connector boundary: the inbound activity envelope model and the
//! outbound reply delivery client.
//!
//! The webhook receives one `Activity` per call; replies are posted back to
//! the service callback address carried on the inbound activity. Delivery is
//! fire-and-forget from the dialog machine's perspective.

pub mod activity;
pub mod reply;

pub use activity::{Activity, ActivityType, ChannelAccount, ConversationAccount};
pub use reply::{DeliveryError, HttpReplyDelivery, RecordingReplyDelivery, ReplyDelivery};
