//! HTTP transport: connection establishment and the HTTP/1.1 wire codec.
//!
//! One fresh connection per send; the phase tracer is fed from here.

pub mod connector;
pub mod h1;
