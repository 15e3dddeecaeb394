//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware registered
//! with [`Router::layer`] is applied once, when the router is built, so a
//! request pays one vtable call per layer and nothing else.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, Middleware};
use crate::request::Request;
use crate::response::ResponseWriter;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve),
/// or call [`Router::build`] to drive requests in-process.
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: Vec<(Method, String, BoxedHandler)>,
    layers: Vec<Middleware>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            layers: Vec::new(),
            fallback: Arc::new(not_found),
        }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use problemdetails::{Request, ResponseWriter, Router};
    /// # use http::Method;
    /// # fn get_user(_: &mut dyn ResponseWriter, _: &mut Request) {}
    /// # fn delete_user(_: &mut dyn ResponseWriter, _: &mut Request) {}
    /// Router::new()
    ///     .on(Method::DELETE, "/users/{id}", delete_user)
    ///     .on(Method::GET,    "/users/{id}", get_user);
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let handler: BoxedHandler = Arc::new(handler);
        self.routes.push((method, path.to_owned(), handler));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Handler for requests no route matches. Defaults to a bare `404`.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = Arc::new(handler);
        self
    }

    /// Wraps every route, and the fallback, in `middleware`.
    /// The first layer added is the outermost.
    pub fn layer<M>(mut self, middleware: M) -> Self
    where
        M: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Applies the middleware stack and builds the lookup trees.
    pub fn build(self) -> Result<App, Error> {
        let wrap = |handler: BoxedHandler| {
            self.layers.iter().rev().fold(handler, |next, layer| layer(next))
        };

        let mut trees: HashMap<Method, MatchitRouter<BoxedHandler>> = HashMap::new();
        for (method, path, handler) in &self.routes {
            trees
                .entry(method.clone())
                .or_default()
                .insert(path.as_str(), wrap(Arc::clone(handler)))
                .map_err(|source| Error::Route { path: path.clone(), source })?;
        }

        Ok(App { trees, fallback: wrap(Arc::clone(&self.fallback)) })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn not_found(w: &mut dyn ResponseWriter, _req: &mut Request) {
    w.write_header(StatusCode::NOT_FOUND);
}

/// A built [`Router`]: routes resolved, middleware applied.
pub struct App {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
    fallback: BoxedHandler,
}

impl App {
    /// Finds the handler chain for a request, with its path parameters.
    pub(crate) fn resolve(&self, method: &Method, path: &str) -> (BoxedHandler, HashMap<String, String>) {
        let matched = self.trees.get(method).and_then(|tree| tree.at(path).ok());
        match matched {
            Some(m) => {
                let params = m.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                (Arc::clone(m.value), params)
            }
            None => (Arc::clone(&self.fallback), HashMap::new()),
        }
    }

    /// Runs one request through the matching handler chain.
    pub fn handle(&self, w: &mut dyn ResponseWriter, req: Request) -> Request {
        let (handler, params) = self.resolve(req.method(), req.path());
        let mut req = req.with_params(params);
        handler.call(w, &mut req);
        req
    }
}
