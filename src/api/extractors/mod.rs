/*!
 * Request-scoped values handed from the access middleware to handlers.
 *
 * Public API:
 * - Caller: the verified Identity, if the route is protected
 * - Routed: the UpstreamTarget resolved for this request
 */

mod routed;

pub use routed::{Caller, Routed};
