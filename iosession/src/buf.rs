//! Cursor-based byte buffer used for every message that crosses a transport.
//!
//! [`IoBuffer`] owns its memory and tracks four indices:
//!
//! ```text
//! 0 <= mark <= position <= limit <= capacity
//! ```
//!
//! - **position**: next byte to read (outbound) or write (inbound).
//! - **limit**: end of the valid region.
//! - **mark**: optional rewind point, see [`IoBuffer::reset`].
//!
//! # Buffer Lifecycle
//!
//! Outbound buffers are marked when wrapped in a
//! [`WriteRequest`](crate::WriteRequest). The transport consumes them by
//! advancing `position` until nothing remains. Before the message-sent event
//! fires the session rewinds to the mark, so listeners see the same view the
//! producer handed in, and afterwards puts the cursor back where the
//! transport left it.
//!
//! Inbound buffers are allocated empty, filled by the transport (advancing
//! `position`) and [flipped](IoBuffer::flip) by the session before they are
//! handed to the pipeline.
//!
//! ```
//! use iosession::IoBuffer;
//!
//! let mut buf = IoBuffer::from(&b"hello"[..]);
//! buf.mark();
//! buf.advance(5);
//! assert!(!buf.has_remaining());
//!
//! buf.reset();
//! assert_eq!(buf.chunk(), b"hello");
//! ```

use std::fmt;

/// Result type for operations that return both a result and a buffer.
///
/// Transports take ownership of a buffer for the duration of an operation
/// and hand it back together with the outcome.
pub type BufResult<T, B> = (std::io::Result<T>, B);

/// Owned byte buffer with a position, a limit and an optional mark.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct IoBuffer {
  data: Vec<u8>,
  position: usize,
  limit: usize,
  mark: Option<usize>,
}

impl IoBuffer {
  /// Allocates a zeroed buffer ready to be filled.
  ///
  /// `position` is 0 and `limit` equals `capacity`.
  pub fn allocate(capacity: usize) -> Self {
    Self { data: vec![0; capacity], position: 0, limit: capacity, mark: None }
  }

  /// Wraps existing bytes as a buffer ready to be consumed.
  pub fn wrap(data: Vec<u8>) -> Self {
    let limit = data.len();
    Self { data, position: 0, limit, mark: None }
  }

  pub fn capacity(&self) -> usize {
    self.data.len()
  }

  pub fn position(&self) -> usize {
    self.position
  }

  /// Moves the cursor.
  ///
  /// A mark beyond the new position is discarded.
  ///
  /// # Panics
  ///
  /// Panics if `position` is greater than the limit.
  pub fn set_position(&mut self, position: usize) {
    assert!(
      position <= self.limit,
      "IoBuffer::set_position: position ({}) exceeds limit ({})",
      position,
      self.limit
    );
    self.position = position;
    if self.mark.is_some_and(|mark| mark > position) {
      self.mark = None;
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  /// Sets the end of the valid region, pulling position and mark back if
  /// they lie beyond it.
  ///
  /// # Panics
  ///
  /// Panics if `limit` is greater than the capacity.
  pub fn set_limit(&mut self, limit: usize) {
    assert!(
      limit <= self.data.len(),
      "IoBuffer::set_limit: limit ({}) exceeds capacity ({})",
      limit,
      self.data.len()
    );
    self.limit = limit;
    if self.position > limit {
      self.position = limit;
    }
    if self.mark.is_some_and(|mark| mark > limit) {
      self.mark = None;
    }
  }

  /// Bytes between position and limit.
  #[inline]
  pub fn remaining(&self) -> usize {
    self.limit - self.position
  }

  #[inline]
  pub fn has_remaining(&self) -> bool {
    self.position < self.limit
  }

  /// Remembers the current position as the rewind point.
  pub fn mark(&mut self) {
    self.mark = Some(self.position);
  }

  /// Returns the mark, if one is set.
  pub fn mark_position(&self) -> Option<usize> {
    self.mark
  }

  /// Rewinds the cursor to the mark, or to the start when no mark is set.
  ///
  /// The mark itself is kept, so a buffer can be rewound any number of times.
  pub fn reset(&mut self) {
    self.position = self.mark.unwrap_or(0);
  }

  /// Prepares a filled buffer for reading: the limit becomes the current
  /// position and the position goes back to zero.
  pub fn flip(&mut self) {
    self.limit = self.position;
    self.position = 0;
    self.mark = None;
  }

  /// Makes the whole capacity writable again. The bytes are left in place.
  pub fn clear(&mut self) {
    self.position = 0;
    self.limit = self.data.len();
    self.mark = None;
  }

  /// Consumes `cnt` bytes.
  ///
  /// # Panics
  ///
  /// Panics if `cnt` is greater than [`remaining`](IoBuffer::remaining).
  pub fn advance(&mut self, cnt: usize) {
    let remaining = self.remaining();
    assert!(
      cnt <= remaining,
      "IoBuffer::advance: cannot advance by {} bytes, only {} remaining",
      cnt,
      remaining
    );
    self.position += cnt;
  }

  /// The readable bytes, `position..limit`.
  pub fn chunk(&self) -> &[u8] {
    &self.data[self.position..self.limit]
  }

  /// The writable bytes, `position..limit`.
  ///
  /// Transports fill this region and then [`advance`](IoBuffer::advance) by
  /// the number of bytes written.
  pub fn spare_mut(&mut self) -> &mut [u8] {
    &mut self.data[self.position..self.limit]
  }

  /// Copies `src` in at the position and advances past it.
  ///
  /// # Panics
  ///
  /// Panics if `src` does not fit in the remaining space.
  pub fn put_slice(&mut self, src: &[u8]) {
    let remaining = self.remaining();
    assert!(
      src.len() <= remaining,
      "IoBuffer::put_slice: {} bytes do not fit, only {} remaining",
      src.len(),
      remaining
    );
    let end = self.position + src.len();
    self.data[self.position..end].copy_from_slice(src);
    self.position = end;
  }

  /// Copies the readable bytes out.
  pub fn to_vec(&self) -> Vec<u8> {
    self.chunk().to_vec()
  }

  /// Puts back a cursor captured earlier, clamped to what the buffer can hold
  /// now.
  pub(crate) fn restore(&mut self, position: usize, limit: usize) {
    self.limit = limit.min(self.data.len());
    self.position = position.min(self.limit);
  }
}

impl fmt::Debug for IoBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IoBuffer")
      .field("position", &self.position)
      .field("limit", &self.limit)
      .field("capacity", &self.data.len())
      .field("mark", &self.mark)
      .finish()
  }
}

impl From<Vec<u8>> for IoBuffer {
  fn from(value: Vec<u8>) -> Self {
    Self::wrap(value)
  }
}

impl From<&[u8]> for IoBuffer {
  fn from(value: &[u8]) -> Self {
    Self::wrap(value.to_vec())
  }
}

impl From<&str> for IoBuffer {
  fn from(value: &str) -> Self {
    Self::wrap(value.as_bytes().to_vec())
  }
}

impl From<bytes::Bytes> for IoBuffer {
  fn from(value: bytes::Bytes) -> Self {
    Self::wrap(Vec::from(value))
  }
}

/// Implementation of `bytes::Buf` for `IoBuffer`.
///
/// Lets decoders written against the `bytes` ecosystem consume received
/// buffers directly. Reading through this trait moves the same cursor as
/// [`IoBuffer::advance`].
impl bytes::Buf for IoBuffer {
  fn remaining(&self) -> usize {
    IoBuffer::remaining(self)
  }

  fn chunk(&self) -> &[u8] {
    IoBuffer::chunk(self)
  }

  fn advance(&mut self, cnt: usize) {
    IoBuffer::advance(self, cnt)
  }
}

#[cfg(feature = "zeroize")]
impl Drop for IoBuffer {
  fn drop(&mut self) {
    use zeroize::Zeroize;
    self.data.zeroize();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_is_writable() {
    let buf = IoBuffer::allocate(16);
    assert_eq!(buf.position(), 0);
    assert_eq!(buf.limit(), 16);
    assert_eq!(buf.remaining(), 16);
  }

  #[test]
  fn reset_without_mark_goes_to_start() {
    let mut buf = IoBuffer::from(&b"abcdef"[..]);
    buf.advance(4);
    buf.reset();
    assert_eq!(buf.position(), 0);
  }

  #[test]
  fn reset_returns_to_mark_repeatedly() {
    let mut buf = IoBuffer::from(&b"abcdef"[..]);
    buf.advance(2);
    buf.mark();
    buf.advance(4);
    buf.reset();
    assert_eq!(buf.chunk(), b"cdef");
    buf.advance(1);
    buf.reset();
    assert_eq!(buf.position(), 2);
  }

  #[test]
  fn set_position_below_mark_discards_it() {
    let mut buf = IoBuffer::from(&b"abcdef"[..]);
    buf.advance(3);
    buf.mark();
    buf.set_position(1);
    assert_eq!(buf.mark_position(), None);
  }

  #[test]
  fn fill_then_flip() {
    let mut buf = IoBuffer::allocate(8);
    buf.put_slice(b"abc");
    assert_eq!(buf.remaining(), 5);
    buf.flip();
    assert_eq!(buf.chunk(), b"abc");
    assert_eq!(buf.limit(), 3);
  }

  #[test]
  fn spare_mut_then_advance() {
    let mut buf = IoBuffer::allocate(4);
    buf.spare_mut()[..2].copy_from_slice(b"hi");
    buf.advance(2);
    buf.flip();
    assert_eq!(buf.to_vec(), b"hi");
  }

  #[test]
  fn set_limit_pulls_position_back() {
    let mut buf = IoBuffer::from(&b"abcdef"[..]);
    buf.advance(5);
    buf.set_limit(3);
    assert_eq!(buf.position(), 3);
    assert!(!buf.has_remaining());
  }

  #[test]
  #[should_panic(expected = "cannot advance")]
  fn advance_past_limit_panics() {
    let mut buf = IoBuffer::from(&b"ab"[..]);
    buf.advance(3);
  }

  #[test]
  fn restore_clamps_to_capacity() {
    let mut buf = IoBuffer::from(&b"abc"[..]);
    buf.restore(10, 10);
    assert_eq!(buf.limit(), 3);
    assert_eq!(buf.position(), 3);
  }

  #[test]
  fn bytes_buf_moves_the_same_cursor() {
    use bytes::Buf;

    let mut buf = IoBuffer::from(&b"Hello!!!"[..]);
    assert_eq!(buf.get_u8(), b'H');
    assert_eq!(buf.position(), 1);

    let bytes = buf.copy_to_bytes(4);
    assert_eq!(&bytes[..], b"ello");
    assert_eq!(Buf::remaining(&buf), 3);
    assert_eq!(Buf::chunk(&buf), b"!!!");
  }
}
