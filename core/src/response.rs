/*
 * response.rs
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

//! Per-stream outbound response adapter.
//!
//! A `Response` is a cheap-to-clone shared handle: the connection keeps one in
//! its independent response list for late cancellation, handlers may keep
//! another for as long as they like. Writes queue bytes and post a command to
//! the owning connection task; the engine is only ever touched from there, so
//! a handle living on another task never races the session.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::buffer::{ByteQueue, Chunk};
use crate::engine::ProducerSignal;
use crate::request::Request;

/// Commands posted by response handles into the owning connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Submit the pending header frame and data producer for the stream.
    Submit { stream_id: u32 },
    /// Resume data production for the stream and flush.
    Resume { stream_id: u32 },
}

struct ResponseState {
    queue: ByteQueue,
    /// Headers queued via set_header before write_head merges them.
    extra_headers: Vec<(String, String)>,
    /// Merged header list waiting for the connection task to submit.
    pending_submit: Option<Vec<(String, String)>>,
    headers_sent: bool,
    ended: bool,
    /// Engine back-reference severed; writes are dropped silently.
    detached: bool,
}

/// Outbound side of one stream.
#[derive(Clone)]
pub struct Response {
    stream_id: u32,
    request: Arc<Request>,
    state: Arc<Mutex<ResponseState>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Response {
    pub(crate) fn new(
        stream_id: u32,
        request: Arc<Request>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            stream_id,
            request,
            state: Arc::new(Mutex::new(ResponseState {
                queue: ByteQueue::new(),
                extra_headers: Vec::new(),
                pending_submit: None,
                headers_sent: false,
                ended: false,
                detached: false,
            })),
            commands,
        }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// The request this response answers.
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Queue an extra header to be merged by a later [`Response::write_head`].
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut st = self.state.lock().unwrap();
        if st.headers_sent {
            return;
        }
        st.extra_headers.push((name.into(), value.into()));
    }

    /// Send the header frame. No-op if headers were already sent or the stream
    /// is detached. Merges the synthesized `:status` pseudo-header, the caller
    /// headers and any queued extra headers; `transfer-encoding` is stripped
    /// unconditionally (framing happens below this layer). `reason` is
    /// accepted for interface parity and not transmitted: HTTP/2 carries no
    /// reason phrase.
    pub fn write_head(&self, status: u16, reason: Option<&str>, headers: &[(String, String)]) {
        let _ = reason;
        {
            let mut st = self.state.lock().unwrap();
            if st.headers_sent || st.detached {
                return;
            }
            let extra = std::mem::take(&mut st.extra_headers);
            let mut merged = Vec::with_capacity(1 + headers.len() + extra.len());
            merged.push((":status".to_string(), status.to_string()));
            for (name, value) in headers {
                if !name.eq_ignore_ascii_case("transfer-encoding") {
                    merged.push((name.clone(), value.clone()));
                }
            }
            for (name, value) in extra {
                if !name.eq_ignore_ascii_case("transfer-encoding") {
                    merged.push((name, value));
                }
            }
            st.pending_submit = Some(merged);
            st.headers_sent = true;
        }
        let _ = self.commands.send(Command::Submit {
            stream_id: self.stream_id,
        });
    }

    /// Append body data and wake the engine's producer. Silently dropped once
    /// the stream is detached or the response has ended.
    pub fn write(&self, payload: impl Into<Chunk>) {
        {
            let mut st = self.state.lock().unwrap();
            if st.detached || st.ended {
                return;
            }
            st.queue.push(payload.into());
        }
        let _ = self.commands.send(Command::Resume {
            stream_id: self.stream_id,
        });
    }

    /// Mark the response ended. Idempotent. End-of-stream is only signalled to
    /// the peer once the queue fully drains.
    pub fn end(&self) {
        {
            let mut st = self.state.lock().unwrap();
            if st.detached {
                return;
            }
            st.ended = true;
        }
        let _ = self.commands.send(Command::Resume {
            stream_id: self.stream_id,
        });
    }

    pub fn has_ended(&self) -> bool {
        self.state.lock().unwrap().ended
    }

    /// Sever the stream from its engine session. Idempotent; fires the
    /// originating request's cancel notification at most once, and only when
    /// the response never ended. Safe to call during connection teardown, even
    /// after the stream's context is gone.
    pub(crate) fn cancel(&self) {
        let fire = {
            let mut st = self.state.lock().unwrap();
            if st.detached {
                return;
            }
            st.detached = true;
            !st.ended
        };
        if fire {
            if let Some(handler) = self.request.take_cancel_handler() {
                handler();
            }
        }
    }

    /// Take the merged header list queued by write_head, once.
    pub(crate) fn take_pending_submit(&self) -> Option<Vec<(String, String)>> {
        self.state.lock().unwrap().pending_submit.take()
    }

    /// Zero-copy production check, engine-side.
    pub(crate) fn poll_produce(&self) -> ProducerSignal {
        let st = self.state.lock().unwrap();
        if st.queue.is_empty() {
            if st.ended {
                ProducerSignal::Eof
            } else {
                ProducerSignal::Deferred
            }
        } else {
            // Front element exists, so the length is present.
            ProducerSignal::Available(st.queue.peek_next_len().unwrap_or(0))
        }
    }

    /// Dequeue whole elements covering `len` bytes for a write-time callback.
    /// None means the request cannot be satisfied exactly: either fewer than
    /// `len` bytes are buffered, or `len` would split an element. Both report
    /// would-block with nothing consumed, and the engine retries; partial or
    /// excess data is never written.
    pub(crate) fn take_for_send(&self, len: usize) -> Option<Vec<Chunk>> {
        let mut st = self.state.lock().unwrap();
        if !st.queue.has(len) || !st.queue.aligned(len) {
            return None;
        }
        let mut chunks = Vec::new();
        let mut written = 0usize;
        while written < len {
            match st.queue.take_front() {
                Some(chunk) => {
                    written += chunk.len();
                    chunks.push(chunk);
                }
                None => break,
            }
        }
        Some(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_response() -> (Response, mpsc::UnboundedReceiver<Command>, Arc<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = Arc::new(Request::from_h2_headers(
            &[(":method".to_string(), "GET".to_string())],
            "peer".to_string(),
        ));
        (Response::new(1, Arc::clone(&request), tx), rx, request)
    }

    #[test]
    fn write_head_merges_and_strips_transfer_encoding() {
        let (resp, mut rx, _req) = make_response();
        resp.set_header("x-extra", "1");
        resp.write_head(
            200,
            Some("OK"),
            &[
                ("content-type".to_string(), "text/plain".to_string()),
                ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ],
        );
        assert!(matches!(rx.try_recv(), Ok(Command::Submit { stream_id: 1 })));
        let merged = resp.take_pending_submit().unwrap();
        assert_eq!(
            merged,
            vec![
                (":status".to_string(), "200".to_string()),
                ("content-type".to_string(), "text/plain".to_string()),
                ("x-extra".to_string(), "1".to_string()),
            ]
        );
        assert!(resp.take_pending_submit().is_none());
    }

    #[test]
    fn second_write_head_is_a_no_op() {
        let (resp, mut rx, _req) = make_response();
        resp.write_head(200, None, &[]);
        resp.write_head(500, None, &[]);
        assert!(matches!(rx.try_recv(), Ok(Command::Submit { stream_id: 1 })));
        assert!(rx.try_recv().is_err(), "only one submit command expected");
        let merged = resp.take_pending_submit().unwrap();
        assert_eq!(merged[0], (":status".to_string(), "200".to_string()));
    }

    #[test]
    fn write_after_end_is_dropped() {
        let (resp, _rx, _req) = make_response();
        resp.write("before");
        resp.end();
        resp.write("after");
        assert_eq!(resp.take_for_send(6), Some(vec![Chunk::Text("before".to_string())]));
        assert_eq!(resp.poll_produce(), ProducerSignal::Eof);
    }

    #[test]
    fn end_is_idempotent_and_eof_waits_for_drain() {
        let (resp, _rx, _req) = make_response();
        resp.write(vec![0u8; 10]);
        resp.end();
        resp.end();
        // 10 bytes still queued: not EOF yet, and 20 bytes would under-run.
        assert_eq!(resp.poll_produce(), ProducerSignal::Available(10));
        assert!(resp.take_for_send(20).is_none());
        let chunks = resp.take_for_send(10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(resp.poll_produce(), ProducerSignal::Eof);
    }

    #[test]
    fn empty_write_then_end_reaches_eof() {
        let (resp, _rx, _req) = make_response();
        resp.write("");
        resp.write(Vec::<u8>::new());
        resp.end();
        // Nothing was queued, so the drained-and-ended state is EOF at once.
        assert_eq!(resp.poll_produce(), ProducerSignal::Eof);
    }

    #[test]
    fn empty_writes_between_data_do_not_stall_the_queue() {
        let (resp, _rx, _req) = make_response();
        resp.write("");
        resp.write("data");
        resp.write("");
        resp.end();
        assert_eq!(resp.poll_produce(), ProducerSignal::Available(4));
        assert_eq!(resp.take_for_send(4), Some(vec![Chunk::Text("data".to_string())]));
        assert_eq!(resp.poll_produce(), ProducerSignal::Eof);
    }

    #[test]
    fn misaligned_take_reports_would_block_and_consumes_nothing() {
        let (resp, _rx, _req) = make_response();
        resp.write("abcdef");
        resp.write("gh");
        // Splitting the front element is refused; boundaries are honored.
        assert!(resp.take_for_send(4).is_none());
        assert!(resp.take_for_send(7).is_none());
        assert_eq!(resp.poll_produce(), ProducerSignal::Available(6));
        assert_eq!(
            resp.take_for_send(6),
            Some(vec![Chunk::Text("abcdef".to_string())])
        );
        assert_eq!(
            resp.take_for_send(2),
            Some(vec![Chunk::Text("gh".to_string())])
        );
    }

    #[test]
    fn deferred_until_resumed_by_write() {
        let (resp, _rx, _req) = make_response();
        assert_eq!(resp.poll_produce(), ProducerSignal::Deferred);
        resp.write("x");
        assert_eq!(resp.poll_produce(), ProducerSignal::Available(1));
    }

    #[test]
    fn cancel_fires_handler_exactly_once() {
        let (resp, _rx, req) = make_response();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        req.set_cancel_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        resp.cancel();
        resp.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_after_end_skips_handler() {
        let (resp, _rx, req) = make_response();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        req.set_cancel_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        resp.end();
        resp.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn writes_after_cancel_are_no_ops() {
        let (resp, mut rx, _req) = make_response();
        resp.cancel();
        resp.write(Bytes::from_static(b"dropped").to_vec());
        resp.end();
        resp.write_head(200, None, &[]);
        assert!(rx.try_recv().is_err(), "detached response must not command the session");
        assert_eq!(resp.poll_produce(), ProducerSignal::Deferred);
    }
}
