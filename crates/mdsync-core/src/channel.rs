use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery strategy, chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Push,
    Poll,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Push => "push",
            SyncMode::Poll => "poll",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "push" | "ws" | "websocket" => Ok(SyncMode::Push),
            "poll" | "fetch" => Ok(SyncMode::Poll),
            other => Err(format!("unknown sync mode '{other}'")),
        }
    }
}

/// Lifecycle of the push connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Failed,
    Lost,
}

impl ChannelState {
    pub fn on(self, event: ChannelEvent) -> Self {
        match (self, event) {
            (ChannelState::Connecting, ChannelEvent::Opened) => ChannelState::Open,
            (ChannelState::Connecting, ChannelEvent::Failed) => ChannelState::Closed,
            (ChannelState::Connecting, ChannelEvent::Lost) => ChannelState::Closed,
            (ChannelState::Open, ChannelEvent::Opened) => ChannelState::Open,
            (ChannelState::Open, ChannelEvent::Failed) => ChannelState::Closed,
            (ChannelState::Open, ChannelEvent::Lost) => ChannelState::Closed,
            (ChannelState::Closed, _) => ChannelState::Closed,
        }
    }

    pub fn can_send(&self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Push(ChannelState),
    Poll,
}

impl ConnectionMode {
    pub fn new(mode: SyncMode) -> Self {
        match mode {
            SyncMode::Push => ConnectionMode::Push(ChannelState::Connecting),
            SyncMode::Poll => ConnectionMode::Poll,
        }
    }

    pub fn sync_mode(&self) -> SyncMode {
        match self {
            ConnectionMode::Push(_) => SyncMode::Push,
            ConnectionMode::Poll => SyncMode::Poll,
        }
    }

    /// Poll mode has no connection; events are ignored there.
    pub fn on(self, event: ChannelEvent) -> Self {
        match self {
            ConnectionMode::Push(state) => ConnectionMode::Push(state.on(event)),
            ConnectionMode::Poll => ConnectionMode::Poll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_channel_lifecycle() {
        let state = ChannelState::Connecting;
        assert!(!state.can_send());

        let open = state.on(ChannelEvent::Opened);
        assert_eq!(open, ChannelState::Open);
        assert!(open.can_send());

        let lost = open.on(ChannelEvent::Lost);
        assert_eq!(lost, ChannelState::Closed);
        assert_eq!(lost.on(ChannelEvent::Opened), ChannelState::Closed);
    }

    #[test]
    fn failed_connect_is_terminal() {
        let state = ChannelState::Connecting.on(ChannelEvent::Failed);
        assert_eq!(state, ChannelState::Closed);
        assert!(!state.can_send());
    }

    #[test]
    fn poll_mode_ignores_channel_events() {
        let mode = ConnectionMode::new(SyncMode::Poll);
        assert_eq!(mode.on(ChannelEvent::Lost), ConnectionMode::Poll);
        assert_eq!(mode.sync_mode(), SyncMode::Poll);
    }

    #[test]
    fn sync_mode_parses_aliases() {
        assert_eq!("push".parse::<SyncMode>(), Ok(SyncMode::Push));
        assert_eq!(" WS ".parse::<SyncMode>(), Ok(SyncMode::Push));
        assert_eq!("poll".parse::<SyncMode>(), Ok(SyncMode::Poll));
        assert!("carrier-pigeon".parse::<SyncMode>().is_err());
    }
}
