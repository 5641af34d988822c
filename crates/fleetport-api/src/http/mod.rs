pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use extract::{TenantId, TENANT_HEADER};
pub use server::{router, run_http_server, HttpServerConfig};
pub use state::AppState;
