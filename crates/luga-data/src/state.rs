//! Fetch lifecycle state shared by every data source.

use std::fmt;

use serde_json::{Map, Value};

/// Lifecycle state of a data source.
///
/// `Unset → Loading → Ready | Error`, and back to `Loading` on every
/// subsequent load. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// Nothing has been loaded or declared yet.
    #[default]
    Unset,
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed.
    Error,
    /// Records reflect the last successful load.
    Ready,
}

impl State {
    /// Wire name used in template contexts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Ready => "ready",
        }
    }

    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }

    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The state flags every context carries.
    #[must_use]
    pub fn describe(self) -> Map<String, Value> {
        let mut map = Map::new();
        let state = match self {
            Self::Unset => Value::Null,
            other => Value::String(other.as_str().to_owned()),
        };
        map.insert("state".into(), state);
        map.insert("isStateLoading".into(), Value::Bool(self.is_loading()));
        map.insert("isStateError".into(), Value::Bool(self.is_error()));
        map.insert("isStateReady".into(), Value::Bool(self.is_ready()));
        map
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
