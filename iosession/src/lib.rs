#![cfg_attr(docsrs, feature(doc_cfg))]

//! # iosession - per-connection I/O state machine
//!
//! `iosession` drives one network connection: it keeps a receive
//! outstanding on the transport at all times, serializes outbound writes so
//! exactly one is in flight, and pushes every I/O event through an ordered
//! chain of filters ending in an application handler.
//!
//! ## Features
//! - **Single writer**: concurrent [`flush`](IoSession::flush) calls never
//!   start a second send loop, and a write enqueued while the loop is
//!   finishing is never stranded.
//! - **Fault containment**: a panicking filter or handler is reported to a
//!   [`FaultMonitor`] and the loops keep running.
//! - **Pluggable transport**: anything implementing [`Transport`]; a tokio
//!   TCP transport ships behind the `tcp` feature.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "tcp")]
//! # async fn example() -> std::io::Result<()> {
//! use std::sync::Arc;
//!
//! use iosession::{IoSession, Message, TcpTransport};
//! use iosession::filter::{CommonEvents, FilterChain, IoHandler, TracingFilter};
//!
//! struct Echo;
//!
//! impl IoHandler for Echo {
//!   fn message_received(&self, session: &Arc<IoSession>, message: &mut Message) {
//!     if let Some(buf) = message.as_buffer() {
//!       let _ = session.write(buf.to_vec());
//!     }
//!   }
//! }
//!
//! let transport = TcpTransport::connect("127.0.0.1:7878").await?;
//! let session = IoSession::builder(transport)
//!   .filter_chain(
//!     FilterChain::builder()
//!       .add_last("log", CommonEvents(TracingFilter::default()))
//!       .build(Echo),
//!   )
//!   .build();
//! session.open();
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature   | Default | Description                                  |
//! |-----------|---------|----------------------------------------------|
//! | `tcp`     | yes     | [`TcpTransport`] on top of tokio             |
//! | `zeroize` | no      | wipe [`IoBuffer`] memory when it is dropped  |

pub mod buf;
pub mod config;
pub mod error;
pub mod event;
pub mod fault;
pub mod filter;
pub mod session;
pub mod transport;
pub mod write;

pub use buf::{BufResult, IoBuffer};
pub use config::SessionConfig;
pub use error::SessionError;
pub use fault::{FaultMonitor, TracingFaultMonitor};
pub use session::{IoSession, IoSessionStats, SessionBuilder};
#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
pub use transport::TcpTransport;
pub use transport::{ReceiveCompletion, SendCompletion, Transport};
pub use write::{
  Message, WriteOutcome, WriteReceipt, WriteRequest, WriteRequestQueue,
};
