//! Packet source implementations

pub mod tcp;

pub use tcp::TcpProvider;
