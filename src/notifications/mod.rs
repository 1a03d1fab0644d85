//! User notifications and the background poller

mod models;
pub mod poller;

pub use models::{Notification, NotificationEvent, NotificationSummary};
pub use poller::{NotificationPoller, PollOutcome, PollState};
