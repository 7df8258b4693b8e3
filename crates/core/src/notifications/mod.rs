//! In-app notifications with scoped and recorded placement.
//!
//! A [`NotificationManager`] owns the live list. [`NotificationScope`] and
//! [`NotificationRecorder`] wrap any [`NotificationSink`] so a component can
//! withdraw everything it placed when it goes away.

pub mod manager;
pub mod message;
pub mod scope;

pub use manager::{Notification, NotificationManager, NotificationPlacement, NotificationSink};
pub use message::{
    Clock, ManualClock, NotificationId, NotificationMessage, NotificationType, SystemClock,
    UriFilter,
};
pub use scope::{NotificationRecorder, NotificationScope};
