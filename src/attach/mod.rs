//! Attach endpoint: address handling and the accept loop.
//!
//! Clients connect to an optional socket (unix-domain path or TCP address)
//! to observe the supervised process's output and inject input. The only
//! public API here is [`ListenAddr`] parsing/validation, the [`Listener`]
//! it binds to, and [`AttachServer`], which owns the accept loop.

mod addr;
mod server;

pub use addr::{ListenAddr, Listener};
pub use server::AttachServer;
