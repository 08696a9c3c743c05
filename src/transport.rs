//! 传输层：基于 reqwest 的连接池、超时与凭据解析。
//!
//! HTTP transport for the event endpoint.

mod credentials;
mod http;

pub use credentials::CredentialSource;
pub use http::{HttpTransport, TransportError};
