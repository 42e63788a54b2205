pub mod forwarder;
pub mod route_table;
pub mod upstream;

pub use forwarder::{Forwarder, ProxiedRequest, build_client};
pub use route_table::{Access, RouteSpec, RouteTable, UpstreamTarget};
pub use upstream::Upstream;
