//! Echoes every received chunk back to the peer.
//!
//! ```sh
//! RUST_LOG=iosession=debug cargo run --example echo_server
//! nc 127.0.0.1 7878
//! ```

use std::sync::Arc;

use iosession::{
  IoSession, Message, SessionConfig, TcpTransport,
  filter::{CommonEvents, FilterChain, IoHandler, TracingFilter},
};
use tokio::{net::TcpListener, runtime::Handle};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Echo;

impl IoHandler for Echo {
  fn session_opened(&self, session: &Arc<IoSession>) {
    info!(session_id = session.id(), peer = ?session.peer_addr(), "connected");
  }

  fn message_received(&self, session: &Arc<IoSession>, message: &mut Message) {
    if let Some(buf) = message.as_buffer() {
      let _ = session.write(buf.to_vec());
    }
  }

  fn session_closed(&self, session: &Arc<IoSession>) {
    let stats = session.stats();
    info!(
      session_id = session.id(),
      read = stats.read_bytes(),
      written = stats.written_bytes(),
      "disconnected"
    );
  }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let listener = TcpListener::bind("127.0.0.1:7878").await?;
  info!(addr = %listener.local_addr()?, "listening");

  loop {
    let (stream, _) = listener.accept().await?;
    let chain = FilterChain::builder()
      .add_last("log", CommonEvents(TracingFilter::new("log")))
      .build(Echo);
    let session = IoSession::builder(TcpTransport::new(stream, Handle::current()))
      .config(SessionConfig::new().with_read_buffer_size(4096))
      .filter_chain(chain)
      .build();
    session.open();
  }
}
