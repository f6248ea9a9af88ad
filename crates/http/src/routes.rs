//! Method and path routing for RSVP requests.

use std::{collections::HashMap, fmt::Display};

use http::{Method, StatusCode};
use routefinder::{Captures, Router as PathRouter};
use rsvp_core::{create_rsvp, delete_rsvp, Reply};
use rsvp_model::DatabaseLocation;

/// The route accepting new RSVPs.
pub const CREATE_ROUTE: &str = "/rsvp";
/// The route deleting an RSVP by id.
pub const DELETE_ROUTE: &str = "/rsvp/:id";

/// Route parameters extracted from a path that matched a route pattern.
pub type Params = Captures<'static, 'static>;

type Handler = dyn Fn(&DatabaseLocation, &Params, &[u8]) -> Reply + Send + Sync;

struct Route {
    pattern: String,
    handler: Box<Handler>,
}

/// The outcome of routing a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Routed {
    /// The reply produced by the handler.
    pub reply: Reply,
    /// The pattern of the route that handled the request, if any matched.
    pub route: Option<String>,
}

struct RouteMatch<'a> {
    route: Option<&'a str>,
    params: Params,
    handler: &'a Handler,
}

/// Dispatches requests to handlers by method and path pattern.
#[derive(Default)]
pub struct Router {
    methods_map: HashMap<Method, PathRouter<Route>>,
    registered: Vec<(Method, String)>,
}

impl Display for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Registered routes:")?;
        for (method, pattern) in self.routes() {
            writeln!(f, "- {method}: {pattern}")?;
        }
        Ok(())
    }
}

impl Router {
    /// Construct a new, empty Router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the path for the specified HTTP method.
    pub fn add<F>(&mut self, method: Method, path: &str, handler: F) -> anyhow::Result<()>
    where
        F: Fn(&DatabaseLocation, &Params, &[u8]) -> Reply + Send + Sync + 'static,
    {
        let route = Route {
            pattern: path.to_owned(),
            handler: Box::new(handler),
        };
        self.methods_map
            .entry(method.clone())
            .or_default()
            .add(path, route)
            .map_err(|e| anyhow::anyhow!("invalid route '{path}': {e}"))?;
        self.registered.push((method, path.to_owned()));
        Ok(())
    }

    /// Register a handler at the path for the HTTP POST method.
    pub fn post<F>(&mut self, path: &str, handler: F) -> anyhow::Result<()>
    where
        F: Fn(&DatabaseLocation, &Params, &[u8]) -> Reply + Send + Sync + 'static,
    {
        self.add(Method::POST, path, handler)
    }

    /// Register a handler at the path for the HTTP DELETE method.
    pub fn delete<F>(&mut self, path: &str, handler: F) -> anyhow::Result<()>
    where
        F: Fn(&DatabaseLocation, &Params, &[u8]) -> Reply + Send + Sync + 'static,
    {
        self.add(Method::DELETE, path, handler)
    }

    /// Iterates over the registered `(method, pattern)` pairs in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.registered
            .iter()
            .map(|(method, pattern)| (method, pattern.as_str()))
    }

    /// Dispatches a request to the matching handler along with the path parameters.
    pub fn handle(
        &self,
        location: &DatabaseLocation,
        method: &Method,
        path: &str,
        body: &[u8],
    ) -> Routed {
        let RouteMatch {
            route,
            params,
            handler,
        } = self.find(method, path);
        tracing::trace!(?route, "Routing {method} {path}");
        Routed {
            reply: handler(location, &params, body),
            route: route.map(ToOwned::to_owned),
        }
    }

    fn find(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let best_match = self
            .methods_map
            .get(method)
            .and_then(|r| r.best_match(path));

        match best_match {
            Some(m) => {
                let params = m.captures().into_owned();
                let route = m.handler();
                RouteMatch {
                    route: Some(route.pattern.as_str()),
                    params,
                    handler: route.handler.as_ref(),
                }
            }
            None => self.fail(method, path),
        }
    }

    // Picks between 405 and 404 when nothing matched the method and path.
    fn fail(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let is_method_not_allowed = self
            .methods_map
            .iter()
            .filter(|(k, _)| *k != method)
            .any(|(_, r)| r.best_match(path).is_some());

        let handler: &Handler = if is_method_not_allowed {
            &method_not_allowed
        } else {
            &not_found
        };
        RouteMatch {
            route: None,
            params: Captures::default(),
            handler,
        }
    }
}

fn not_found(_location: &DatabaseLocation, _params: &Params, _body: &[u8]) -> Reply {
    Reply::from_status(StatusCode::NOT_FOUND)
}

fn method_not_allowed(_location: &DatabaseLocation, _params: &Params, _body: &[u8]) -> Reply {
    Reply::from_status(StatusCode::METHOD_NOT_ALLOWED)
}

/// Builds the router serving the RSVP endpoints:
///
/// - `POST /rsvp` creates an RSVP from a JSON body.
/// - `DELETE /rsvp/:id` deletes the RSVP with the given id.
pub fn rsvp_router() -> anyhow::Result<Router> {
    let mut router = Router::new();
    router.post(CREATE_ROUTE, |location, _params, body| {
        create_rsvp(location, body).into()
    })?;
    router.delete(DELETE_ROUTE, |location, params, _body| {
        delete_rsvp(location, params.get("id").unwrap_or_default()).into()
    })?;
    Ok(router)
}
