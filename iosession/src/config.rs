/// Per-session settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
  read_buffer_size: usize,
}

impl SessionConfig {
  pub const DEFAULT_READ_BUFFER_SIZE: usize = 2048;

  pub fn new() -> Self {
    Self::default()
  }

  /// Size of the buffer allocated for each receive.
  ///
  /// # Panics
  ///
  /// Panics if `size` is zero; a zero-sized read is indistinguishable from
  /// the peer closing the connection.
  pub fn with_read_buffer_size(mut self, size: usize) -> Self {
    assert!(size > 0, "SessionConfig: read buffer size must be non-zero");
    self.read_buffer_size = size;
    self
  }

  pub fn read_buffer_size(&self) -> usize {
    self.read_buffer_size
  }
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self { read_buffer_size: Self::DEFAULT_READ_BUFFER_SIZE }
  }
}
