//! Runtime flags consulted at the start of every broker call.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Refuse every new connection.
    pub fail_new_connections: bool,
    /// Kill switch for the whole system.
    pub emergency_disable: bool,
}

impl Flags {
    pub fn connections_disabled(&self) -> bool {
        self.fail_new_connections || self.emergency_disable
    }
}

/// Source of the current flag values.
pub trait FlagsReader: Send + Sync {
    fn current(&self) -> Flags;
}

/// Flags that never change.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFlags(pub Flags);

impl FlagsReader for StaticFlags {
    fn current(&self) -> Flags {
        self.0
    }
}

/// Observable flags. Writers call [`WatchFlags::set`] or
/// [`WatchFlags::update`]; readers either poll through [`FlagsReader`] or
/// subscribe for change notifications.
#[derive(Debug)]
pub struct WatchFlags {
    tx: watch::Sender<Flags>,
}

impl WatchFlags {
    pub fn new(initial: Flags) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, flags: Flags) {
        self.tx.send_replace(flags);
    }

    pub fn update(&self, modify: impl FnOnce(&mut Flags)) {
        self.tx.send_modify(modify);
    }

    pub fn subscribe(&self) -> watch::Receiver<Flags> {
        self.tx.subscribe()
    }
}

impl Default for WatchFlags {
    fn default() -> Self {
        Self::new(Flags::default())
    }
}

impl FlagsReader for WatchFlags {
    fn current(&self) -> Flags {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_flags_reflect_updates() {
        let flags = WatchFlags::default();
        let mut rx = flags.subscribe();
        assert!(!flags.current().connections_disabled());

        flags.update(|f| f.emergency_disable = true);
        assert!(flags.current().connections_disabled());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().emergency_disable);
    }

    #[test]
    fn missing_fields_default_to_false() {
        let flags: Flags = serde_json::from_str(r#"{ "fail_new_connections": true }"#).unwrap();
        assert!(flags.fail_new_connections);
        assert!(!flags.emergency_disable);
    }

    #[test]
    fn unrelated_flags_are_ignored() {
        let json = r#"{ "emergency_disable": true, "disable_data_removal_listener": true }"#;
        let flags: Flags = serde_json::from_str(json).unwrap();
        assert_eq!(
            flags,
            Flags {
                fail_new_connections: false,
                emergency_disable: true,
            }
        );
    }
}
