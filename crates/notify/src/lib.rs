//! Hestia alert dispatch and delivery infrastructure.
//!
//! This crate turns a newly published listing into subscriber
//! notifications:
//!
//! - [`AlertDispatcher`] — runs one matching pass for one listing: loads
//!   the active saved searches, evaluates the match predicate, and fans
//!   out one delivery attempt per matching search and channel.
//! - [`store`] — the dispatcher's collaborator seams (criteria store,
//!   delivery log) and their PostgreSQL implementations.
//! - [`gateway`] — external delivery channels (SMTP email, chat-bot
//!   webhooks) behind a uniform send interface.
//! - [`MatchNotice`] — the message payload rendered per channel.

pub mod dispatcher;
pub mod gateway;
pub mod notice;
pub mod store;

pub use dispatcher::{AlertDispatcher, DispatchError, DispatchSummary, DispatcherConfig};
pub use gateway::email::{EmailConfig, EmailGateway};
pub use gateway::chat::{ChatConfig, ChatGateway};
pub use gateway::{ChannelGateways, GatewayError, NotificationGateway};
pub use notice::MatchNotice;
pub use store::{ActiveSearch, CriteriaStore, DeliveryLog, PgCriteriaStore, PgDeliveryLog};
