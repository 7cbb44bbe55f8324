/*
 * engine.rs
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

//! Framing engine capability contract.
//!
//! The engine owns frame parsing, HPACK, flow-control windowing and settings
//! negotiation. The adapter injects it as a capability object and talks to it
//! through these traits; the engine never sees the transport or the handler
//! chain directly.

use bytes::Bytes;
use std::io;

/// SETTINGS identifier for the concurrent stream cap (RFC 7540 §6.5.2).
pub const SETTINGS_MAX_CONCURRENT_STREAMS: u16 = 0x3;

/// RST_STREAM error code: graceful close, no error.
pub const ERROR_NO_ERROR: u32 = 0x0;
/// RST_STREAM error code sent when a request body exceeds the configured cap.
pub const ERROR_ENHANCE_YOUR_CALM: u32 = 0xb;

/// Answer to a zero-copy data-production check for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerSignal {
    /// Stream ended and its queue is drained: signal end-of-stream, zero bytes.
    Eof,
    /// Bytes are queued; the value is the unconsumed length of the front
    /// element, available without copying.
    Available(usize),
    /// Queue empty but the stream is still open. The engine must not poll
    /// again until production is explicitly resumed.
    Deferred,
}

/// Outcome of a write-time data callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Fewer bytes buffered than requested; the engine retries later. Partial
    /// data is never written.
    WouldBlock,
}

/// Per-stream events dispatched by the engine while it consumes received
/// transport bytes. Implementors must tolerate events for unknown or
/// already-closed stream ids (late callbacks are dropped, never a crash).
pub trait StreamEvents {
    /// A request HEADERS frame opened a stream.
    fn begin_headers(&mut self, stream_id: u32);

    /// One decoded header pair, in receipt order. Duplicates allowed.
    fn header(&mut self, stream_id: u32, name: &str, value: &str);

    /// The header block for the stream is complete.
    fn headers_complete(&mut self, stream_id: u32);

    /// A chunk of request body data.
    fn data_chunk(&mut self, stream_id: u32, data: Bytes);

    /// The end-of-stream flag was observed on a DATA frame.
    fn data_complete(&mut self, stream_id: u32);

    /// The stream closed, cleanly or with an error code.
    fn stream_close(&mut self, stream_id: u32, error_code: u32);
}

/// Callbacks the engine invokes while producing pending output.
pub trait EngineOutput {
    /// Serialized non-body frames (headers, settings, window updates...),
    /// copied; forward to the transport in order.
    fn send(&mut self, data: &[u8]);

    /// Zero-copy availability check before the engine schedules a DATA frame.
    fn poll_stream(&mut self, stream_id: u32) -> ProducerSignal;

    /// Actual write time: emit `frame_header` followed by exactly `len` bytes
    /// of queued stream data, by ownership transfer. `len` is a value a prior
    /// [`EngineOutput::poll_stream`] advertised, so whole elements cover it.
    fn send_stream_data(&mut self, stream_id: u32, frame_header: &[u8], len: usize) -> SendOutcome;
}

/// A server-role HTTP/2 framing engine bound to one connection.
pub trait FramingEngine: Send {
    /// Queue a SETTINGS frame (sent with the next [`FramingEngine::produce`]).
    fn submit_settings(&mut self, settings: &[(u16, u32)]) -> io::Result<()>;

    /// Submit response headers for a stream and associate the stream with the
    /// zero-copy data producer (polled through [`EngineOutput`]).
    fn submit_response(&mut self, stream_id: u32, headers: &[(String, String)]) -> io::Result<()>;

    /// Resume data production for a stream previously deferred.
    fn resume_stream(&mut self, stream_id: u32) -> io::Result<()>;

    /// Queue a RST_STREAM for the stream.
    fn reset_stream(&mut self, stream_id: u32, error_code: u32) -> io::Result<()>;

    /// Consume received transport bytes, dispatching stream events as frames
    /// complete. An error is a protocol violation and is connection-fatal.
    fn feed(&mut self, data: &[u8], events: &mut dyn StreamEvents) -> io::Result<()>;

    /// Send pending output through `output` until nothing more can be produced
    /// (deferral and would-block pause individual streams, not the call).
    fn produce(&mut self, output: &mut dyn EngineOutput) -> io::Result<()>;
}
