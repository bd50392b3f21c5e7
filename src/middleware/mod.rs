pub mod response;
pub mod security_headers;

pub use response::{defensive_error, DefensiveJson, XSSI_PREFIX};
pub use security_headers::security_headers_middleware;
