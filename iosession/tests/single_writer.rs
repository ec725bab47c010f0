mod common;

use std::{sync::Arc, thread, time::Duration};

use common::{Recorder, ThreadedTransport};
use iosession::{IoSession, WriteReceipt, filter::FilterChain};

const PRODUCERS: u8 = 4;
const WRITES_PER_PRODUCER: u8 = 50;
const FRAME: usize = 8;

fn frame(producer: u8, seq: u8) -> Vec<u8> {
  let mut frame = vec![producer, seq];
  frame.resize(FRAME, producer ^ seq);
  frame
}

fn threaded_session() -> (Arc<IoSession>, ThreadedTransport, Recorder) {
  let transport = ThreadedTransport::new();
  let recorder = Recorder::new();
  let session = IoSession::builder(transport.clone())
    .filter_chain(FilterChain::new(recorder.clone()))
    .build();
  (session, transport, recorder)
}

fn settle(receipts: Vec<WriteReceipt>) {
  for mut receipt in receipts {
    let outcome = receipt
      .recv_timeout(Duration::from_secs(5))
      .expect("write was stranded in the queue");
    outcome.expect("write failed");
  }
}

#[test]
fn concurrent_producers_never_overlap_sends() {
  let (session, transport, recorder) = threaded_session();

  let producers: Vec<_> = (0..PRODUCERS)
    .map(|producer| {
      let session = Arc::clone(&session);
      thread::spawn(move || {
        (0..WRITES_PER_PRODUCER)
          .map(|seq| session.write(frame(producer, seq)))
          .collect::<Vec<_>>()
      })
    })
    .collect();

  let receipts: Vec<_> = producers
    .into_iter()
    .flat_map(|producer| producer.join().unwrap())
    .collect();
  settle(receipts);

  assert_eq!(transport.max_in_flight(), 1);
  assert!(!session.is_writing());

  let total = PRODUCERS as usize * WRITES_PER_PRODUCER as usize;
  assert_eq!(session.stats().written_messages(), total as u64);
  assert_eq!(session.stats().written_bytes(), (total * FRAME) as u64);
  assert_eq!(recorder.sent().len(), total);

  // Frames are never interleaved and each producer's frames keep their order.
  let wire = transport.wire();
  assert_eq!(wire.len(), total * FRAME);
  let mut next_seq = vec![0u8; PRODUCERS as usize];
  for chunk in wire.chunks(FRAME) {
    let (producer, seq) = (chunk[0], chunk[1]);
    assert_eq!(chunk, frame(producer, seq).as_slice());
    assert_eq!(seq, next_seq[producer as usize]);
    next_seq[producer as usize] += 1;
  }
}

#[test]
fn flush_storm_during_a_drain() {
  let (session, transport, _recorder) = threaded_session();
  let receipts: Vec<_> =
    (0..20).map(|seq| session.write(frame(0, seq))).collect();

  let flushers: Vec<_> = (0..8)
    .map(|_| {
      let session = Arc::clone(&session);
      thread::spawn(move || {
        for _ in 0..100 {
          session.flush().unwrap();
        }
      })
    })
    .collect();
  for flusher in flushers {
    flusher.join().unwrap();
  }

  settle(receipts);
  assert_eq!(transport.max_in_flight(), 1);
  assert_eq!(session.stats().written_messages(), 20);
}

// A write offered while the loop is finishing must not wait for another
// flush.
#[test]
fn no_write_is_stranded() {
  for _ in 0..200 {
    let (session, transport, _recorder) = threaded_session();
    let first = session.write(frame(1, 0));

    let other = Arc::clone(&session);
    let racer = thread::spawn(move || {
      thread::sleep(Duration::from_micros(fastrand::u64(0..300)));
      other.write(frame(2, 0))
    });
    let second = racer.join().unwrap();

    settle(vec![first, second]);
    assert!(!session.is_writing());
    assert_eq!(transport.wire().len(), 2 * FRAME);
  }
}
