//! HTTP transport
//!
//! The client talks to the network only through [`Transport`], so tests and
//! embedders can swap the `reqwest` implementation.

mod transport;

pub use transport::{
    RawResponse, ReqwestTransport, ReqwestTransportBuilder, Transport, TransportError,
};
