//! Middleware composition order, declared as data.
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← X-Request-ID header, request span
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Logging      │ ← entry / completion lines
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Recover      │ ← panic → 500 api_error
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← 401, protected routes only
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! The first stage in [`Pipeline::names`] is the outermost. Router-wide
//! stages are applied by [`Pipeline::wrap`]; the auth stage is attached per
//! route by [`Pipeline::protect`] so that unprotected routes never see it.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::routing::MethodRouter;

use super::{AuthLayer, LoggingLayer, RequestIdLayer, recover};
use crate::auth::AuthChain;

/// One decorator in the request pipeline.
#[derive(Clone)]
pub enum Stage {
    RequestId,
    Logging,
    Recover,
    Auth(Arc<AuthChain>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestId => "request_id",
            Self::Logging => "logging",
            Self::Recover => "recover",
            Self::Auth(_) => "auth",
        }
    }

    fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Self::RequestId => router.layer(RequestIdLayer::new()),
            Self::Logging => router.layer(LoggingLayer::new()),
            Self::Recover => router.layer(recover::layer()),
            // Route-scoped, see `Pipeline::protect`.
            Self::Auth(_) => router,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of stages, outermost first.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build the standard pipeline. The auth stage is omitted when `chain`
    /// has no authenticators.
    pub fn new(chain: AuthChain) -> Self {
        let mut stages = vec![Stage::RequestId, Stage::Logging, Stage::Recover];
        if !chain.is_empty() {
            stages.push(Stage::Auth(Arc::new(chain)));
        }
        Self { stages }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_chain().is_some()
    }

    fn auth_chain(&self) -> Option<&Arc<AuthChain>> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Auth(chain) => Some(chain),
            _ => None,
        })
    }

    /// Attach the auth stage to a single route's method handlers.
    ///
    /// Uses `route_layer`, so the route's 405 fallback stays unauthenticated.
    pub fn protect<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.auth_chain() {
            Some(chain) => route.route_layer(AuthLayer::new(chain.clone())),
            None => route,
        }
    }

    /// Apply the router-wide stages so the first stage ends up outermost.
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| stage.apply(router))
    }
}
