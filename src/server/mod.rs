//! Plain-text HTTP/1.1 command server

mod connection;
mod listener;

pub use listener::RelayServer;
