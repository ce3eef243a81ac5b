//! Timed user-visible messages

use std::cell::RefCell;
use std::time::{Duration, Instant};

use super::pubsub::PubSub;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub text: String,
    pub severity: Severity,
    pub issued: Instant,
    pub timeout: Duration,
}

impl Message {
    pub fn new(text: impl Into<String>, severity: Severity, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            severity,
            issued: Instant::now(),
            timeout,
        }
    }

    pub fn info(text: impl Into<String>, timeout: Duration) -> Self {
        Self::new(text, Severity::Info, timeout)
    }

    pub fn warning(text: impl Into<String>, timeout: Duration) -> Self {
        Self::new(text, Severity::Warning, timeout)
    }

    pub fn error(text: impl Into<String>, timeout: Duration) -> Self {
        Self::new(text, Severity::Error, timeout)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued) >= self.timeout
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageEvent {
    Posted,
    Cleared,
}

/// The single message slot shown above the command line
#[derive(Default)]
pub struct MessageCenter {
    current: RefCell<Option<Message>>,
    pub events: PubSub<MessageEvent>,
}

impl MessageCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message`, replacing whatever was shown
    pub fn post(&self, message: Message) {
        match message.severity {
            Severity::Error => tracing::warn!(message = %message.text, "Showing error"),
            _ => tracing::debug!(message = %message.text, "Showing message"),
        }
        *self.current.borrow_mut() = Some(message);
        self.events.notify(&MessageEvent::Posted);
    }

    pub fn current(&self) -> Option<Message> {
        self.current.borrow().clone()
    }

    pub fn clear(&self) {
        if self.current.borrow_mut().take().is_some() {
            self.events.notify(&MessageEvent::Cleared);
        }
    }

    /// Clear the message once its timeout has passed. Returns whether it was cleared.
    pub fn expire(&self, now: Instant) -> bool {
        let expired = self
            .current
            .borrow()
            .as_ref()
            .is_some_and(|m| m.is_expired(now));
        if expired {
            self.clear();
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Recorder;

    #[test]
    fn messages_expire_after_their_timeout() {
        let center = MessageCenter::new();
        let events = Recorder::new();
        center.events.subscribe(&events);

        let message = Message::error("boom", Duration::from_secs(2));
        let issued = message.issued;
        center.post(message);

        assert!(!center.expire(issued + Duration::from_millis(1999)));
        assert!(center.current().is_some());
        assert!(center.expire(issued + Duration::from_secs(2)));
        assert!(center.current().is_none());
        assert_eq!(events.take(), vec![MessageEvent::Posted, MessageEvent::Cleared]);
    }

    #[test]
    fn posting_replaces_the_current_message() {
        let center = MessageCenter::new();
        center.post(Message::info("one", Duration::from_secs(1)));
        center.post(Message::warning("two", Duration::from_secs(1)));

        let current = center.current().unwrap();
        assert_eq!(current.text, "two");
        assert_eq!(current.severity, Severity::Warning);
    }
}
