//! Real-time transport: wire protocol, connection groups, sessions.

pub mod hub;
pub mod protocol;
pub mod session;
