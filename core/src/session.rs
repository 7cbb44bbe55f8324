/*
 * session.rs
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

//! Per-connection session: stream contexts, event routing, and the read loop.
//!
//! One connection is one task; the engine's event and production callbacks all
//! execute serially on it, so the per-stream object graph needs no locking of
//! its own. Responses are additionally retained in a list independent of their
//! stream contexts, so a late cancellation (connection close after an error
//! path already tore the stream down) never touches freed state.

use bytes::{Bytes, BytesMut};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::buffer::Chunk;
use crate::engine::{
    EngineOutput, FramingEngine, ProducerSignal, SendOutcome, StreamEvents,
    ERROR_ENHANCE_YOUR_CALM, SETTINGS_MAX_CONCURRENT_STREAMS,
};
use crate::error::SessionError;
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::{Command, Response};
use crate::transport::Transport;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct Http2Config {
    /// Advertised in the initial SETTINGS frame.
    pub max_concurrent_streams: u32,
    /// Cap on accumulated request body bytes per stream; the stream is reset
    /// when exceeded. None accumulates without bound.
    pub max_request_body: Option<usize>,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            max_concurrent_streams: 100,
            max_request_body: None,
        }
    }
}

/// Per-stream lifecycle, driven solely by engine events. Close is terminal
/// and is modelled by removal from the live map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    HeadersReceiving,
    Dispatched,
    BodyReceiving,
}

/// Inbound state for one live stream.
struct RequestContext {
    state: StreamState,
    /// Raw header pairs in receipt order, pseudo-headers included.
    raw_headers: Vec<(String, String)>,
    body: BytesMut,
    /// Retained only when no chain handler claimed the request and the
    /// response is still open, for full-body delivery later.
    request: Option<Arc<Request>>,
    /// At most one response is ever attached.
    response: Option<Response>,
}

impl RequestContext {
    fn new() -> Self {
        Self {
            state: StreamState::HeadersReceiving,
            raw_headers: Vec::new(),
            body: BytesMut::new(),
            request: None,
            response: None,
        }
    }
}

/// Everything of a session except the engine, so engine calls can borrow the
/// rest of the session as their callback target.
struct SessionCore {
    peer_addr: String,
    config: Http2Config,
    handlers: Vec<Arc<dyn RequestHandler>>,
    /// Live stream contexts, keyed by stream id.
    streams: HashMap<u32, RequestContext>,
    /// Responses retained independently of their contexts for safe late
    /// cancellation; drained only at connection teardown.
    responses: Vec<Response>,
    commands: mpsc::UnboundedSender<Command>,
    /// Outbound chunks produced by engine callbacks, written after the call.
    outbox: VecDeque<Chunk>,
    /// Streams to reset once the engine call in progress returns.
    pending_resets: Vec<(u32, u32)>,
}

impl StreamEvents for SessionCore {
    fn begin_headers(&mut self, stream_id: u32) {
        if self.streams.contains_key(&stream_id) {
            return;
        }
        trace!(stream_id, "stream open");
        self.streams.insert(stream_id, RequestContext::new());
    }

    fn header(&mut self, stream_id: u32, name: &str, value: &str) {
        if let Some(ctx) = self.streams.get_mut(&stream_id) {
            if ctx.state == StreamState::HeadersReceiving {
                ctx.raw_headers.push((name.to_string(), value.to_string()));
            }
        }
    }

    fn headers_complete(&mut self, stream_id: u32) {
        let raw = match self.streams.get_mut(&stream_id) {
            Some(ctx) if ctx.state == StreamState::HeadersReceiving => {
                ctx.state = StreamState::Dispatched;
                std::mem::take(&mut ctx.raw_headers)
            }
            _ => return,
        };

        let request = Arc::new(Request::from_h2_headers(&raw, self.peer_addr.clone()));
        let response = Response::new(stream_id, Arc::clone(&request), self.commands.clone());
        self.responses.push(response.clone());
        debug!(stream_id, method = request.method(), path = request.path(), "request dispatched");

        let mut claimed = false;
        for handler in &self.handlers {
            if handler.handle_request(&request, &response) || response.has_ended() {
                claimed = true;
                break;
            }
        }

        if let Some(ctx) = self.streams.get_mut(&stream_id) {
            if !claimed && !response.has_ended() {
                ctx.request = Some(request);
            }
            ctx.response = Some(response);
        }
    }

    fn data_chunk(&mut self, stream_id: u32, data: Bytes) {
        let over_cap = match self.streams.get(&stream_id) {
            Some(ctx) => self
                .config
                .max_request_body
                .map(|cap| ctx.body.len() + data.len() > cap)
                .unwrap_or(false),
            None => return,
        };
        if over_cap {
            warn!(stream_id, "request body over configured cap, resetting stream");
            if let Some(ctx) = self.streams.remove(&stream_id) {
                if let Some(response) = &ctx.response {
                    response.cancel();
                }
            }
            self.pending_resets.push((stream_id, ERROR_ENHANCE_YOUR_CALM));
            return;
        }
        if let Some(ctx) = self.streams.get_mut(&stream_id) {
            if ctx.state == StreamState::Dispatched {
                ctx.state = StreamState::BodyReceiving;
            }
            ctx.body.extend_from_slice(&data);
        }
    }

    fn data_complete(&mut self, stream_id: u32) {
        if let Some(ctx) = self.streams.get_mut(&stream_id) {
            if let Some(request) = &ctx.request {
                // Taking the handler makes a spurious repeat a no-op.
                if let Some(handler) = request.take_body_handler() {
                    let body = ctx.body.split().freeze();
                    handler(body);
                }
            }
        }
    }

    fn stream_close(&mut self, stream_id: u32, error_code: u32) {
        // Safe even when headers never completed: the context then carries no
        // response and is simply dropped.
        if let Some(ctx) = self.streams.remove(&stream_id) {
            trace!(stream_id, error_code, "stream closed");
            if let Some(response) = &ctx.response {
                response.cancel();
            }
        }
    }
}

impl EngineOutput for SessionCore {
    fn send(&mut self, data: &[u8]) {
        self.outbox.push_back(Chunk::Binary(data.to_vec()));
    }

    fn poll_stream(&mut self, stream_id: u32) -> ProducerSignal {
        match self.streams.get(&stream_id).and_then(|ctx| ctx.response.as_ref()) {
            Some(response) => response.poll_produce(),
            None => ProducerSignal::Deferred,
        }
    }

    fn send_stream_data(&mut self, stream_id: u32, frame_header: &[u8], len: usize) -> SendOutcome {
        let response = match self.streams.get(&stream_id).and_then(|ctx| ctx.response.as_ref()) {
            Some(response) => response,
            None => return SendOutcome::WouldBlock,
        };
        match response.take_for_send(len) {
            Some(chunks) => {
                self.outbox.push_back(Chunk::Binary(frame_header.to_vec()));
                self.outbox.extend(chunks);
                SendOutcome::Sent
            }
            None => SendOutcome::WouldBlock,
        }
    }
}

/// What one loop turn produced.
enum Step {
    Read(usize),
    Cmd(Command),
    CommandsClosed,
}

/// One connection: engine, transport and stream state, driven to completion
/// by [`ConnectionSession::run`].
pub struct ConnectionSession<T: Transport> {
    transport: T,
    engine: Box<dyn FramingEngine>,
    core: SessionCore,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<T: Transport> ConnectionSession<T> {
    pub fn new(
        transport: T,
        engine: Box<dyn FramingEngine>,
        handlers: Vec<Arc<dyn RequestHandler>>,
        config: Http2Config,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer_addr = transport.peer_addr();
        Self {
            transport,
            engine,
            core: SessionCore {
                peer_addr,
                config,
                handlers,
                streams: HashMap::new(),
                responses: Vec::new(),
                commands: tx,
                outbox: VecDeque::new(),
                pending_resets: Vec::new(),
            },
            commands: rx,
        }
    }

    /// Drive the connection until the transport closes or a fatal error.
    /// Teardown always runs: every retained response is cancelled and every
    /// context released before the engine is discarded.
    pub async fn run(mut self) -> Result<(), SessionError> {
        debug!(peer = %self.core.peer_addr, "connection open");
        let result = self.drive().await;
        self.teardown();
        if let Err(e) = &result {
            warn!(peer = %self.core.peer_addr, error = %e, "connection failed");
        }
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.engine.submit_settings(&[(
            SETTINGS_MAX_CONCURRENT_STREAMS,
            self.core.config.max_concurrent_streams,
        )])?;
        self.flush_engine().await?;

        let mut buf = vec![0u8; 8192];
        loop {
            let step = tokio::select! {
                read = self.transport.read(&mut buf) => Step::Read(read?),
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Step::Cmd(cmd),
                    None => Step::CommandsClosed,
                },
            };
            match step {
                Step::Read(0) => return Ok(()),
                Step::Read(n) => {
                    self.engine
                        .feed(&buf[..n], &mut self.core)
                        .map_err(|e| SessionError::Protocol(e.to_string()))?;
                    self.pump().await?;
                }
                Step::Cmd(cmd) => {
                    self.handle_command(cmd);
                    self.pump().await?;
                }
                // The core keeps a sender, so this only happens once the
                // session itself is going away.
                Step::CommandsClosed => return Ok(()),
            }
        }
    }

    /// Apply work queued during an engine call, then flush pending output.
    async fn pump(&mut self) -> Result<(), SessionError> {
        for (stream_id, error_code) in std::mem::take(&mut self.core.pending_resets) {
            if let Err(e) = self.engine.reset_stream(stream_id, error_code) {
                trace!(stream_id, error = %e, "reset on inactive stream ignored");
            }
        }
        while let Ok(cmd) = self.commands.try_recv() {
            self.handle_command(cmd);
        }
        self.flush_engine().await
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit { stream_id } => {
                let pending = self
                    .core
                    .streams
                    .get(&stream_id)
                    .and_then(|ctx| ctx.response.as_ref())
                    .and_then(|response| response.take_pending_submit());
                if let Some(headers) = pending {
                    if let Err(e) = self.engine.submit_response(stream_id, &headers) {
                        debug!(stream_id, error = %e, "submit_response rejected");
                    }
                }
            }
            Command::Resume { stream_id } => {
                if let Err(e) = self.engine.resume_stream(stream_id) {
                    trace!(stream_id, error = %e, "resume on inactive stream ignored");
                }
            }
        }
    }

    async fn flush_engine(&mut self) -> Result<(), SessionError> {
        self.engine
            .produce(&mut self.core)
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        while let Some(chunk) = self.core.outbox.pop_front() {
            self.transport.write_all(chunk.as_slice()).await?;
        }
        self.transport.flush().await?;
        Ok(())
    }

    fn teardown(&mut self) {
        // Cancel through the independent list first so every response detaches
        // from the engine before contexts and the engine itself are dropped.
        for response in self.core.responses.drain(..) {
            response.cancel();
        }
        self.core.streams.clear();
        debug!(peer = %self.core.peer_addr, "connection closed");
    }
}

/// Server front: the ordered handler chain plus configuration, applied to each
/// accepted connection.
pub struct Http2Adapter {
    handlers: Vec<Arc<dyn RequestHandler>>,
    config: Http2Config,
}

impl Http2Adapter {
    pub fn new(config: Http2Config) -> Self {
        Self {
            handlers: Vec::new(),
            config,
        }
    }

    /// Append a handler; chain order is registration order.
    pub fn add_handler(&mut self, handler: Arc<dyn RequestHandler>) {
        self.handlers.push(handler);
    }

    /// Run a connection on the current task.
    pub async fn handle_connection<T: Transport>(
        &self,
        transport: T,
        engine: Box<dyn FramingEngine>,
    ) -> Result<(), SessionError> {
        ConnectionSession::new(transport, engine, self.handlers.clone(), self.config.clone())
            .run()
            .await
    }

    /// Run a connection on its own task. Connections share no state, so no
    /// cross-connection synchronization exists.
    pub fn spawn_connection<T: Transport + 'static>(
        &self,
        transport: T,
        engine: Box<dyn FramingEngine>,
    ) -> tokio::task::JoinHandle<Result<(), SessionError>> {
        let session =
            ConnectionSession::new(transport, engine, self.handlers.clone(), self.config.clone());
        tokio::spawn(session.run())
    }
}

impl Default for Http2Adapter {
    fn default() -> Self {
        Self::new(Http2Config::default())
    }
}
