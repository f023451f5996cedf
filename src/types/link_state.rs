//! Connection lifecycle state

/// Lifecycle state of the link.
///
/// Only connector and reader lifecycle events move this; consumers observe
/// it read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    /// True while a connect attempt or a live session holds the slot.
    pub fn is_active(self) -> bool {
        !matches!(self, LinkState::Disconnected)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
        };
        f.write_str(label)
    }
}
