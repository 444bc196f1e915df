//! Outbound notifications.
//!
//! Workflows queue [`Notification`]s on their unit of work; the engine hands
//! them to a [`Notifier`] after the commit succeeded. Delivery is best-effort:
//! a failing notifier is logged and never fails the transition that caused it.

use std::sync::Mutex;

use thiserror::Error;

use flockerp_auth::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Role {
        role: Role,
        message: String,
    },
    Customer {
        email: String,
        order_ref: String,
        amount: u64,
        name: Option<String>,
    },
}

impl Notification {
    pub fn role(role: Role, message: impl Into<String>) -> Self {
        Notification::Role {
            role,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn notify_role(&self, role: Role, message: &str) -> Result<(), NotifyError>;

    fn notify_customer(
        &self,
        email: &str,
        order_ref: &str,
        amount: u64,
        name: Option<&str>,
    ) -> Result<(), NotifyError>;

    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::Role { role, message } => self.notify_role(*role, message),
            Notification::Customer {
                email,
                order_ref,
                amount,
                name,
            } => self.notify_customer(email, order_ref, *amount, name.as_deref()),
        }
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_role(&self, role: Role, message: &str) -> Result<(), NotifyError> {
        tracing::info!(%role, message, "role notification");
        Ok(())
    }

    fn notify_customer(
        &self,
        email: &str,
        order_ref: &str,
        amount: u64,
        name: Option<&str>,
    ) -> Result<(), NotifyError> {
        tracing::info!(email, order_ref, amount, name, "customer notification");
        Ok(())
    }
}

/// Keeps every notification in memory. Useful in tests and demos.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages sent to `role`, in order.
    pub fn messages_for(&self, role: Role) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Role { role: r, message } if r == role => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError("recording lock poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn notify_role(&self, role: Role, message: &str) -> Result<(), NotifyError> {
        self.record(Notification::role(role, message))
    }

    fn notify_customer(
        &self,
        email: &str,
        order_ref: &str,
        amount: u64,
        name: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.record(Notification::Customer {
            email: email.to_string(),
            order_ref: order_ref.to_string(),
            amount,
            name: name.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_filters_by_role() {
        let notifier = RecordingNotifier::new();
        notifier
            .deliver(&Notification::role(Role::Manager, "invoice pending"))
            .unwrap();
        notifier
            .deliver(&Notification::role(Role::Accountant, "order created"))
            .unwrap();

        assert_eq!(notifier.messages_for(Role::Manager), vec!["invoice pending"]);
        assert_eq!(notifier.sent().len(), 2);
    }
}
