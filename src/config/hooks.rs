//! Caller-supplied callbacks and middleware.

use crate::error::HookError;
use crate::model::{Model, Record};
use crate::query::{QueryDescriptor, RequestInfo};
use axum::{extract::Request, middleware::Next, response::Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type PreQueryHook = Arc<dyn Fn(&mut QueryDescriptor, &RequestInfo) + Send + Sync>;
pub type RecordHook = Arc<dyn Fn(&dyn Model, &Record) -> Result<(), HookError> + Send + Sync>;
pub type RecordMutHook = Arc<dyn Fn(&dyn Model, &mut Record) -> Result<(), HookError> + Send + Sync>;

/// Lifecycle callbacks, invoked synchronously inside the handler.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Last adjustment of every built query.
    pub pre_query: Option<PreQueryHook>,
    /// After the record is created, before the response.
    pub after_create: Option<RecordHook>,
    /// After request fields are applied, before the record is saved.
    pub before_update: Option<RecordMutHook>,
    /// After the record is saved, before the response.
    pub after_update: Option<RecordHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_query", &self.pre_query.is_some())
            .field("after_create", &self.after_create.is_some())
            .field("before_update", &self.before_update.is_some())
            .field("after_update", &self.after_update.is_some())
            .finish()
    }
}

pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
pub type PreMiddleware = Arc<dyn Fn(Request, Next) -> BoxResponseFuture + Send + Sync>;
pub type PostMiddleware = Arc<dyn Fn(Response) -> BoxResponseFuture + Send + Sync>;

/// `pre` runs before the route handlers (first listed runs first); `post` transforms every
/// handler response (first listed runs first).
#[derive(Clone, Default)]
pub struct Middleware {
    pub pre: Vec<PreMiddleware>,
    pub post: Vec<PostMiddleware>,
}

impl Middleware {
    pub fn pre<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let mw: PreMiddleware =
            Arc::new(move |req: Request, next: Next| -> BoxResponseFuture { Box::pin(f(req, next)) });
        self.pre.push(mw);
        self
    }

    pub fn post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let mw: PostMiddleware = Arc::new(move |res: Response| -> BoxResponseFuture { Box::pin(f(res)) });
        self.post.push(mw);
        self
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}
