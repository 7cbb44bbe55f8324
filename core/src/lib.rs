/*
 * lib.rs
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

//! Server-side HTTP/2 request/response adapter.
//!
//! Sits between a framing engine (frame parsing, HPACK, flow control — injected
//! via the [`engine::FramingEngine`] trait) and an application handler chain.
//! Engine-level stream events become [`request::Request`] / [`response::Response`]
//! pairs; outbound body data flows through a zero-copy [`buffer::ByteQueue`]
//! drained by the engine's data-production callbacks; stream and connection
//! teardown converge on one idempotent cancellation path.

pub mod buffer;
pub mod engine;
pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use buffer::{ByteQueue, Chunk};
pub use engine::{EngineOutput, FramingEngine, ProducerSignal, SendOutcome, StreamEvents};
pub use error::SessionError;
pub use handler::{handler_fn, RequestHandler};
pub use request::Request;
pub use response::Response;
pub use session::{ConnectionSession, Http2Adapter, Http2Config};
pub use transport::Transport;
