//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span, echoed on the response)
//! 4. Rate limiting (governor, per route group)
//! 5. Auth extractors (per handler)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthUser, OptionalAuth, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
