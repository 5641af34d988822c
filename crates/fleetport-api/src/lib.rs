pub mod domain;
pub mod http;

pub use domain::*;
pub use http::*;
