// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response middleware chain
//!
//! Middlewares run after the host has rendered the page, highest priority
//! first. A failing middleware is logged and skipped so the response is
//! always delivered.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Request, Response};
use crate::error::Result;

/// Post-render response middleware
#[async_trait]
pub trait ResponseMiddleware: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Inspect or modify a rendered response
    async fn on_response(&self, request: &Request, response: &mut Response) -> Result<()>;

    /// Filter - return true if this middleware should handle the request
    fn should_handle(&self, _request: &Request) -> bool {
        true
    }

    /// Priority - higher priority middlewares run first
    fn priority(&self) -> i32 {
        0
    }
}

/// Ordered list of response middlewares
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn ResponseMiddleware>>,
}

impl MiddlewareChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware
    pub fn add<M: ResponseMiddleware + 'static>(&mut self, middleware: M) {
        self.add_shared(Arc::new(middleware));
    }

    /// Add a middleware shared with other chains
    pub fn add_shared(&mut self, middleware: Arc<dyn ResponseMiddleware>) {
        self.middlewares.push(middleware);
        // Stable sort keeps insertion order among equal priorities
        self.middlewares
            .sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Number of middlewares
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Names in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Run every middleware over a rendered response
    pub async fn process(&self, request: &Request, response: &mut Response) {
        for middleware in &self.middlewares {
            if !middleware.should_handle(request) {
                continue;
            }
            if let Err(e) = middleware.on_response(request, response).await {
                tracing::warn!(
                    middleware = middleware.name(),
                    path = %request.path(),
                    error = %e,
                    "Middleware failed, response passed through"
                );
            }
        }
    }

    /// Render a request with the host renderer, then run the chain.
    ///
    /// Only render errors are returned.
    pub async fn handle<F, Fut>(&self, request: &Request, render: F) -> Result<Response>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let mut response = render(request.clone()).await?;
        self.process(request, &mut response).await;
        Ok(response)
    }
}
