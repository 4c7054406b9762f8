//! Backend API: REST client, wire formats and socket connections

pub mod client;
pub mod socket;
pub mod wire;

pub use client::{ApiClient, Endpoints};
pub use socket::{SocketConnection, SocketConnector, SocketEvent, SocketPeer, WsConnector};
