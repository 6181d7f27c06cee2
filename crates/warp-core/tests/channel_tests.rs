// Host-side tests for the single-slot frame channel.

use std::thread;
use warp_core::{AnalysisFrame, FrameChannel};

#[test]
fn latest_before_any_publish_is_zero() {
    let channel = FrameChannel::new();
    assert_eq!(channel.latest(), AnalysisFrame::ZERO);
    assert_eq!(channel.publish_count(), 0);
}

#[test]
fn latest_returns_published_frame_until_replaced() {
    let channel = FrameChannel::new();
    let f = AnalysisFrame::new(10.0, 20.0, 30.0, 15.0);
    channel.publish(f);
    assert_eq!(channel.latest(), f);
    assert_eq!(channel.latest(), f, "re-reading must not consume the frame");

    let g = AnalysisFrame::new(200.0, 0.0, 0.0, 12.5);
    channel.publish(g);
    assert_eq!(channel.latest(), g);
    assert_eq!(channel.publish_count(), 2);
}

#[test]
fn slow_reader_only_sees_newest_frame() {
    let channel = FrameChannel::new();
    for i in 0..10 {
        channel.publish(AnalysisFrame::new(i as f32, 0.0, 0.0, 0.0));
    }
    assert_eq!(channel.latest().low, 9.0);
}

#[test]
fn clones_share_one_slot() {
    let producer = FrameChannel::new();
    let consumer = producer.clone();
    producer.publish(AnalysisFrame::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(consumer.latest(), AnalysisFrame::new(1.0, 2.0, 3.0, 4.0));
}

#[test]
fn concurrent_reader_never_sees_a_torn_frame() {
    // Every published frame has all four fields equal; a mixed read would show
    // fields from two different publishes.
    let channel = FrameChannel::new();
    let producer = channel.clone();
    let writer = thread::spawn(move || {
        for i in 0..20_000u32 {
            let v = (i % 256) as f32;
            producer.publish(AnalysisFrame::new(v, v, v, v));
        }
    });
    for _ in 0..20_000 {
        let f = channel.latest();
        assert!(
            f.low == f.mid && f.mid == f.high && f.high == f.total,
            "torn frame observed: {f:?}"
        );
    }
    writer.join().unwrap();
    assert_eq!(channel.publish_count(), 20_000);
}
