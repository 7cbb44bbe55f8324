/*
 * transport.rs
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

//! Transport stream contract: an async byte stream with a peer address.
//!
//! Connection acceptance and TLS are the caller's business; the session only
//! reads, writes and watches for close. Outbound chunks are written from their
//! owned backing buffers, as ordered `write_all` calls without extra copies.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// One connection's byte stream. Read EOF or a read error is the close signal.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Peer address as a display string, captured for request metadata.
    fn peer_addr(&self) -> String;
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> String {
        TcpStream::peer_addr(self)
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
