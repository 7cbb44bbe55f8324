/*
 * request.rs
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

//! Application-level request, built from a stream's accumulated header block.
//!
//! Pseudo-headers are canonicalized away: `:method` and `:path` become the
//! request line, `:authority` becomes an ordinary `host` header in place, the
//! rest are dropped. Ordinary headers keep receipt order; duplicates allowed.

use bytes::Bytes;
use std::sync::Mutex;

/// Invoked at most once with the full accumulated request body.
pub type BodyHandler = Box<dyn FnOnce(Bytes) + Send>;
/// Invoked at most once when the stream or connection is torn down before the
/// response ended.
pub type CancelHandler = Box<dyn FnOnce() + Send>;

/// One inbound request. Shared between the connection and handlers via `Arc`.
pub struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    peer_addr: String,
    body_handler: Mutex<Option<BodyHandler>>,
    cancel_handler: Mutex<Option<CancelHandler>>,
}

impl Request {
    /// Build from raw h2 header pairs in receipt order.
    pub(crate) fn from_h2_headers(raw: &[(String, String)], peer_addr: String) -> Self {
        let mut method = String::new();
        let mut path = String::new();
        let mut headers = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            if let Some(pseudo) = name.strip_prefix(':') {
                match pseudo {
                    "method" => method = value.clone(),
                    "path" => path = value.clone(),
                    "authority" => headers.push(("host".to_string(), value.clone())),
                    _ => {}
                }
            } else {
                headers.push((name.clone(), value.clone()));
            }
        }
        Self {
            method,
            path,
            headers,
            peer_addr,
            body_handler: Mutex::new(None),
            cancel_handler: Mutex::new(None),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// All headers in receipt order. Names may repeat.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Register the full-body handler. Fires once when the request body
    /// completes, only if no chain handler claimed the request synchronously.
    pub fn set_body_handler(&self, handler: impl FnOnce(Bytes) + Send + 'static) {
        *self.body_handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// Register the cancel notification. Fires once if the stream or the
    /// connection goes away before the response ends.
    pub fn set_cancel_handler(&self, handler: impl FnOnce() + Send + 'static) {
        *self.cancel_handler.lock().unwrap() = Some(Box::new(handler));
    }

    pub(crate) fn take_body_handler(&self) -> Option<BodyHandler> {
        self.body_handler.lock().unwrap().take()
    }

    pub(crate) fn take_cancel_handler(&self) -> Option<CancelHandler> {
        self.cancel_handler.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn canonicalizes_pseudo_headers() {
        let req = Request::from_h2_headers(
            &raw(&[
                (":method", "GET"),
                (":scheme", "https"),
                (":path", "/x"),
                (":authority", "example.net"),
                ("accept", "*/*"),
                ("cookie", "a=1"),
                ("cookie", "b=2"),
            ]),
            "10.0.0.1:55000".to_string(),
        );
        assert_eq!(req.method(), "GET");
        assert_eq!(req.path(), "/x");
        assert_eq!(
            req.headers(),
            &raw(&[
                ("host", "example.net"),
                ("accept", "*/*"),
                ("cookie", "a=1"),
                ("cookie", "b=2"),
            ])[..]
        );
        assert_eq!(req.header("Host"), Some("example.net"));
        assert_eq!(req.header("Cookie"), Some("a=1"));
        assert_eq!(req.peer_addr(), "10.0.0.1:55000");
    }

    #[test]
    fn body_handler_taken_once() {
        let req = Request::from_h2_headers(&raw(&[(":method", "POST")]), String::new());
        req.set_body_handler(|_| {});
        assert!(req.take_body_handler().is_some());
        assert!(req.take_body_handler().is_none());
    }

    #[test]
    fn cancel_handler_taken_once() {
        let req = Request::from_h2_headers(&raw(&[(":method", "GET")]), String::new());
        req.set_cancel_handler(|| {});
        assert!(req.take_cancel_handler().is_some());
        assert!(req.take_cancel_handler().is_none());
    }
}
