use serde::{Deserialize, Serialize};

/// Lifecycle of one job's backend connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Socket created, waiting for the transport to report readiness
    Connecting,
    /// Socket is writable, job request sent or about to be sent
    Open,
    /// At least one worker message has been received
    Streaming,
    /// Worker closed the socket (or the client went away)
    Closed,
    /// Connection timed out or the transport errored
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    /// Whether the lifecycle has an edge from `self` to `next`.
    ///
    /// Any live state may end in `Closed` (client cancellation) or `Failed`.
    pub fn can_transition(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed | Failed, _) => false,
            (Connecting, Open) | (Open, Streaming) => true,
            (_, Closed | Failed) => true,
            _ => false,
        }
    }

    /// Move to `next` if the lifecycle allows it. Returns whether the state changed.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if !self.can_transition(next) {
            if *self != next {
                tracing::debug!("[jobstream:bridge] refusing state {} -> {}", self, next);
            }
            return false;
        }
        tracing::debug!("[jobstream:bridge] state {} -> {}", self, next);
        *self = next;
        true
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_lifecycle() {
        let mut state = ConnectionState::Connecting;
        assert!(state.transition(ConnectionState::Open));
        assert!(state.transition(ConnectionState::Streaming));
        assert!(state.transition(ConnectionState::Closed));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut state = ConnectionState::Failed;
        assert!(!state.transition(ConnectionState::Open));
        assert!(!state.transition(ConnectionState::Closed));
        assert_eq!(state, ConnectionState::Failed);

        let mut state = ConnectionState::Closed;
        assert!(!state.transition(ConnectionState::Failed));
        assert_eq!(state, ConnectionState::Closed);
    }

    #[test]
    fn test_out_of_order_moves_are_refused() {
        let mut state = ConnectionState::Connecting;
        assert!(!state.transition(ConnectionState::Streaming));
        assert_eq!(state, ConnectionState::Connecting);

        let mut state = ConnectionState::Streaming;
        assert!(!state.transition(ConnectionState::Open));
        assert!(!state.transition(ConnectionState::Connecting));
        assert_eq!(state, ConnectionState::Streaming);
    }

    #[test]
    fn test_live_states_can_end_early() {
        let mut connecting = ConnectionState::Connecting;
        assert!(connecting.transition(ConnectionState::Closed));

        let mut connecting = ConnectionState::Connecting;
        assert!(connecting.transition(ConnectionState::Failed));

        let mut open = ConnectionState::Open;
        assert!(open.transition(ConnectionState::Closed));
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        let mut state = ConnectionState::Streaming;
        assert!(!state.transition(ConnectionState::Streaming));
    }
}
