/*
 * handler.rs
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

//! Handler chain contract: ordered capabilities offered each request.

use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// One link in the configured handler chain. Handlers are invoked in order;
/// the first to return true (or to end the response) stops the walk.
///
/// A failing handler must not be able to corrupt connection state: it only
/// ever holds the shared `Request`/`Response` handles, never session internals.
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, request: &Arc<Request>, response: &Response) -> bool;
}

struct FnHandler<F>(F);

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&Arc<Request>, &Response) -> bool + Send + Sync,
{
    fn handle_request(&self, request: &Arc<Request>, response: &Response) -> bool {
        (self.0)(request, response)
    }
}

/// Wrap a closure as a chain handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn RequestHandler>
where
    F: Fn(&Arc<Request>, &Response) -> bool + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}
