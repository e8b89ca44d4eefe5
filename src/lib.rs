//! Browser terminal gateway: authenticates SSH sessions over HTTP and bridges
//! them to WebSocket clients.

pub mod ssh;
pub mod web;
