//! Trading session detection by UTC wall clock
//!
//! Session windows (UTC): Asian 00-08, London 08-16, New York 13-21.
//! The London/New York overlap (13-16) takes priority over either
//! single session.

use chrono::{Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Major trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Asian,
    London,
    NewYork,
    Overlap,
    Closed,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Session::Asian => "asian",
            Session::London => "london",
            Session::NewYork => "new_york",
            Session::Overlap => "overlap",
            Session::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Session active at the given UTC hour
pub fn session_at(hour: u32) -> Session {
    match hour {
        13..=15 => Session::Overlap,
        8..=12 => Session::London,
        16..=20 => Session::NewYork,
        0..=7 => Session::Asian,
        _ => Session::Closed,
    }
}

/// Session active right now
pub fn current_session() -> Session {
    session_at(Utc::now().hour())
}

/// Session open/close events by UTC hour, in day order
const EVENTS: [(u32, &str); 5] = [
    (0, "Asian Open"),
    (8, "London Open"),
    (13, "NY Open / London-NY Overlap"),
    (16, "London Close"),
    (21, "NY Close"),
];

/// Human-readable description of the next session event after the
/// given UTC hour, e.g. `"London Open in 3h"`
pub fn next_event_at(hour: u32) -> String {
    for (event_hour, name) in EVENTS {
        if hour < event_hour {
            return format!("{} in {}h", name, event_hour - hour);
        }
    }
    format!("Asian Open in {}h", 24 - hour)
}

/// Next session event from now
pub fn next_event() -> String {
    next_event_at(Utc::now().hour())
}
