use std::{io, net::SocketAddr, sync::Arc};

use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::{
    TcpStream, ToSocketAddrs,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
  },
  runtime::Handle,
  sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::IoBuffer;

use super::{ReceiveCompletion, SendCompletion, Transport};

/// [`Transport`] over a tokio [`TcpStream`].
///
/// Each operation runs as a task on the given runtime. Closing cancels the
/// operations in flight, which then complete with an error.
pub struct TcpTransport {
  reader: Arc<Mutex<OwnedReadHalf>>,
  writer: Arc<Mutex<OwnedWriteHalf>>,
  local_addr: Option<SocketAddr>,
  peer_addr: Option<SocketAddr>,
  handle: Handle,
  cancel: CancellationToken,
}

impl TcpTransport {
  pub fn new(stream: TcpStream, handle: Handle) -> Self {
    let local_addr = stream.local_addr().ok();
    let peer_addr = stream.peer_addr().ok();
    let (reader, writer) = stream.into_split();
    Self {
      reader: Arc::new(Mutex::new(reader)),
      writer: Arc::new(Mutex::new(writer)),
      local_addr,
      peer_addr,
      handle,
      cancel: CancellationToken::new(),
    }
  }

  /// Wraps a connected std stream. Must be called inside a runtime context
  /// for `handle`'s runtime, which registers the socket with its reactor.
  pub fn from_std(
    stream: std::net::TcpStream,
    handle: Handle,
  ) -> io::Result<Self> {
    stream.set_nonblocking(true)?;
    let stream = {
      let _guard = handle.enter();
      TcpStream::from_std(stream)?
    };
    Ok(Self::new(stream, handle))
  }

  /// Connects on the current runtime.
  pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
    let stream = TcpStream::connect(addr).await?;
    Ok(Self::new(stream, Handle::current()))
  }
}

fn cancelled() -> io::Error {
  io::Error::new(io::ErrorKind::ConnectionAborted, "transport closed")
}

impl Transport for TcpTransport {
  fn local_addr(&self) -> Option<SocketAddr> {
    self.local_addr
  }

  fn peer_addr(&self) -> Option<SocketAddr> {
    self.peer_addr
  }

  fn is_connected(&self) -> bool {
    !self.cancel.is_cancelled()
  }

  fn begin_send(&self, buf: IoBuffer, completion: SendCompletion) {
    let writer = Arc::clone(&self.writer);
    let cancel = self.cancel.clone();
    self.handle.spawn(async move {
      let result = {
        let mut writer = writer.lock().await;
        tokio::select! {
          _ = cancel.cancelled() => Err(cancelled()),
          res = writer.write(buf.chunk()) => res,
        }
      };
      if result.is_err() {
        cancel.cancel();
      }
      completion.complete((result, buf));
    });
  }

  fn begin_receive(&self, mut buf: IoBuffer, completion: ReceiveCompletion) {
    let reader = Arc::clone(&self.reader);
    let cancel = self.cancel.clone();
    self.handle.spawn(async move {
      let result = {
        let mut reader = reader.lock().await;
        tokio::select! {
          _ = cancel.cancelled() => Err(cancelled()),
          res = reader.read(buf.spare_mut()) => res,
        }
      };
      completion.complete((result, buf));
    });
  }

  fn close(&self) {
    self.cancel.cancel();
    trace!(peer = ?self.peer_addr, "shutting down tcp stream");
    let writer = Arc::clone(&self.writer);
    self.handle.spawn(async move {
      let _ = writer.lock().await.shutdown().await;
    });
  }
}
