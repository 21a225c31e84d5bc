//! Route table and request resolution.
//!
//! Only `GET` routes exist. A `GET` whose path differs from a route only by a
//! trailing slash is redirected to the route; everything else is not found.

use http::Method;

/// A registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /api/v1/`
    Root,
    /// `GET /api/v1/hello`
    Hello,
}

impl Route {
    /// Every route.
    pub const ALL: [Self; 2] = [Self::Root, Self::Hello];

    /// Registered path.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Root => "/api/v1/",
            Self::Hello => "/api/v1/hello",
        }
    }

    /// Fixed message returned by the route.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Root => "hello world",
            Self::Hello => "helloooo",
        }
    }
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Handled by a route.
    Matched(Route),
    /// Redirect to the canonical path of a route.
    Redirect(&'static str),
    /// No route.
    NotFound,
}

/// Resolve a request by method and path.
#[must_use]
pub fn resolve(method: &Method, path: &str) -> Resolution {
    if method != Method::GET {
        return Resolution::NotFound;
    }
    if let Some(route) = Route::ALL.into_iter().find(|r| r.path() == path) {
        return Resolution::Matched(route);
    }

    let alternate = match path.strip_suffix('/') {
        Some(trimmed) => trimmed.to_owned(),
        None => format!("{path}/"),
    };
    Route::ALL
        .into_iter()
        .find(|r| r.path() == alternate)
        .map_or(Resolution::NotFound, |r| Resolution::Redirect(r.path()))
}
