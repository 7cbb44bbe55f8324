/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of h2bridge, a server-side HTTP/2 session adapter.
 *
 * h2bridge is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * h2bridge is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with h2bridge.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Connection-fatal session errors.
//!
//! Transient conditions never appear here: queue underflow is reported to the
//! engine as would-block and retried, and events for unknown stream ids are
//! dropped. Only malformed framing or transport failure terminates a session.

use std::fmt;
use std::io;

/// Error terminating a [`crate::session::ConnectionSession`].
#[derive(Debug)]
pub enum SessionError {
    /// The framing engine rejected received bytes as malformed. The whole
    /// connection is torn down; nothing is retried.
    Protocol(String),
    /// Transport read or write failure.
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Protocol(m) => write!(f, "protocol violation: {}", m),
            SessionError::Io(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Io(e)
    }
}
