mod common;

use common::{bytes, manual_session};
use iosession::WriteRequest;
use proptest::prelude::*;

proptest! {
  #[test]
  fn prop_sent_in_admission_order_with_exact_accounting(
    lens in prop::collection::vec(0usize..=64, 1..16),
    seed in any::<u64>(),
  ) {
    let (session, transport, recorder) = manual_session();
    let payloads: Vec<Vec<u8>> = lens
      .iter()
      .enumerate()
      .map(|(i, len)| bytes(*len, i as u8))
      .collect();
    for payload in &payloads {
      session.write_queue().offer(WriteRequest::new(payload.clone()));
    }

    session.flush().unwrap();

    // Complete every send with a random, possibly partial, byte count.
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut reported = 0u64;
    while let Some(pending) = transport.pending_send_len() {
      let n = rng.usize(1..=pending);
      transport.complete_send_partial(n);
      reported += n as u64;
    }

    prop_assert_eq!(recorder.sent(), payloads.clone());
    prop_assert_eq!(transport.wire(), payloads.concat());
    prop_assert_eq!(session.stats().written_bytes(), reported);
    prop_assert_eq!(
      reported,
      lens.iter().map(|len| *len as u64).sum::<u64>()
    );
    prop_assert_eq!(session.stats().written_messages(), lens.len() as u64);
    prop_assert!(!session.is_writing());
  }

  #[test]
  fn prop_received_in_read_order(
    chunks in prop::collection::vec(
      prop::collection::vec(any::<u8>(), 1..=32),
      1..16,
    ),
  ) {
    let (session, transport, recorder) = manual_session();
    session.start();

    for chunk in &chunks {
      transport.deliver(chunk);
    }

    prop_assert_eq!(recorder.received(), chunks.clone());
    prop_assert_eq!(
      session.stats().read_bytes(),
      chunks.iter().map(|chunk| chunk.len() as u64).sum::<u64>()
    );
    prop_assert_eq!(transport.pending_receives(), 1);
  }
}
