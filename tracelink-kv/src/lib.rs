//! A command-style key-value store client with a tracing decorator.
//!
//! The command surface is the [`KvCommands`] trait; [`MemoryKv`] is an
//! in-process implementation, and [`TracedKvClient`] wraps any
//! implementation so every command is recorded as a client span:
//!
//! ```
//! use tracelink::trace::TracerProvider;
//! use tracelink_kv::{KvCommands, MemoryKv, TracedKvClient};
//!
//! let provider = TracerProvider::builder().build();
//! let kv = TracedKvClient::new(MemoryKv::new(), provider.tracer("kv"));
//!
//! kv.set("greeting", "hello").unwrap();
//! assert_eq!(kv.get("greeting").unwrap().as_deref(), Some("hello"));
//! ```

mod commands;
mod memory;
mod traced;

pub use commands::{KvCommands, KvError, KvResult};
pub use memory::MemoryKv;
pub use traced::TracedKvClient;
