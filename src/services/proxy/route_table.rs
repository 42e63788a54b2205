/*
 * Responsibility
 * - URL prefix → upstream service の静的な対応表
 * - public / protected の区別、許可 method、X-User-Role 付与の有無を route ごとに持つ
 * - prefix より後ろの path は検証せずそのまま upstream へ渡す
 */
use axum::http::Method;

use crate::config::UpstreamUrls;
use crate::services::proxy::Upstream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Forwarded without credential verification.
    Public,
    /// Requires a verified `Identity`.
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch {
    Exact,
    /// Matches the prefix itself and anything below `prefix/`.
    Prefix,
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub prefix: &'static str,
    pub path_match: PathMatch,
    pub access: Access,
    pub methods: Vec<Method>,
    pub upstream: Upstream,
    /// Prepended to the remainder of the inbound path on the upstream side.
    pub upstream_path: &'static str,
    pub inject_role: bool,
}

impl RouteSpec {
    fn prefixed(
        prefix: &'static str,
        upstream: Upstream,
        upstream_path: &'static str,
        methods: &[Method],
    ) -> Self {
        Self {
            prefix,
            path_match: PathMatch::Prefix,
            access: Access::Protected,
            methods: methods.to_vec(),
            upstream,
            upstream_path,
            inject_role: false,
        }
    }

    fn with_role(mut self) -> Self {
        self.inject_role = true;
        self
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    pub fn is_public(&self) -> bool {
        self.access == Access::Public
    }

    /// Remainder of `path` after this route's prefix, if the route matches.
    fn remainder<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix)?;
        match self.path_match {
            PathMatch::Exact if rest.is_empty() => Some(rest),
            PathMatch::Exact => None,
            PathMatch::Prefix if rest.is_empty() || rest.starts_with('/') => Some(rest),
            PathMatch::Prefix => None,
        }
    }
}

/// Where a single request goes upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub upstream: Upstream,
    pub base_url: String,
    pub path_suffix: String,
    pub inject_role: bool,
}

impl UpstreamTarget {
    pub fn url(&self, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, self.path_suffix, q),
            _ => format!("{}{}", self.base_url, self.path_suffix),
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub route: &'a RouteSpec,
    pub target: UpstreamTarget,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    // longest prefix first
    routes: Vec<RouteSpec>,
    upstreams: UpstreamUrls,
}

impl RouteTable {
    pub fn new(mut routes: Vec<RouteSpec>, upstreams: UpstreamUrls) -> Self {
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes, upstreams }
    }

    /// The Campus360 routes.
    pub fn campus(upstreams: UpstreamUrls) -> Self {
        let crud = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

        let routes = vec![
            RouteSpec {
                prefix: "/auth/login",
                path_match: PathMatch::Exact,
                access: Access::Public,
                methods: vec![Method::POST],
                upstream: Upstream::Auth,
                upstream_path: "/auth/login",
                inject_role: false,
            },
            RouteSpec::prefixed("/auth/qr", Upstream::Auth, "/qr", &[Method::GET, Method::POST]),
            RouteSpec::prefixed("/auth/admin", Upstream::Auth, "/admin", &crud).with_role(),
            RouteSpec::prefixed("/reservas", Upstream::Reservas, "", &crud),
            RouteSpec::prefixed("/recursos", Upstream::Reservas, "/recursos", &crud),
            RouteSpec::prefixed("/checkin", Upstream::Reservas, "/checkin", &crud),
            RouteSpec::prefixed("/incidencias", Upstream::Incidencias, "", &crud),
            RouteSpec::prefixed("/tickets", Upstream::Incidencias, "", &crud),
            RouteSpec::prefixed("/attendance", Upstream::Attendance, "/api/attendance", &crud)
                .with_role(),
        ];

        Self::new(routes, upstreams)
    }

    pub fn resolve(&self, path: &str) -> Option<Resolved<'_>> {
        self.routes.iter().find_map(|route| {
            let rest = route.remainder(path)?;
            Some(Resolved {
                route,
                target: UpstreamTarget {
                    upstream: route.upstream,
                    base_url: self.upstreams.get(route.upstream).to_string(),
                    path_suffix: format!("{}{}", route.upstream_path, rest),
                    inject_role: route.inject_role,
                },
            })
        })
    }

    /// Target for relaying an upstream's own `/health`.
    pub fn health_target(&self, upstream: Upstream) -> UpstreamTarget {
        UpstreamTarget {
            upstream,
            base_url: self.upstreams.get(upstream).to_string(),
            path_suffix: "/health".to_string(),
            inject_role: false,
        }
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }
}
