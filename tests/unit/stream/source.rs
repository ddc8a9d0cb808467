use std::sync::atomic::AtomicBool;

use crate::encode::video::AccessUnit;

use super::*;

#[derive(Default)]
struct VideoLog {
    tags: Vec<u8>,
    calls: usize,
    forced_keyframes: usize,
    fail_on_call: Option<usize>,
}

/// Fake motion encoder: records the tag (red channel of pixel 0) of every frame in call order.
struct FakeVideo(Arc<Mutex<VideoLog>>);

impl VideoEncoder for FakeVideo {
    fn codec(&self) -> &'static str {
        "fake-video"
    }

    fn encode(&mut self, frame: &Frame) -> anyhow::Result<AccessUnit> {
        let mut log = self.0.lock().unwrap();
        log.calls += 1;
        if log.fail_on_call == Some(log.calls) {
            anyhow::bail!("injected video failure");
        }
        let tag = frame.pixel(0, 0).unwrap()[0];
        log.tags.push(tag);
        Ok(AccessUnit {
            data: vec![0, 0, 0, 1, tag],
            keyframe: log.tags.len() == 1,
        })
    }

    fn force_keyframe(&mut self) {
        self.0.lock().unwrap().forced_keyframes += 1;
    }
}

#[derive(Default)]
struct StillLog {
    tags: Vec<u8>,
    fail: bool,
}

struct FakeStill(Arc<Mutex<StillLog>>);

impl StillImageCodec for FakeStill {
    fn codec(&self) -> &'static str {
        "fake-still"
    }

    fn encode(&self, idx: FrameIndex, frame: &Frame) -> LoopcamResult<Vec<u8>> {
        let mut log = self.0.lock().unwrap();
        if log.fail {
            return Err(LoopcamError::encode_failed("fake-still", idx, "injected"));
        }
        let tag = frame.pixel(0, 0).unwrap()[0];
        log.tags.push(tag);
        Ok(vec![0xFF, 0xD8, tag])
    }
}

struct Harness {
    stream: FrameStreamSource,
    video: Arc<Mutex<VideoLog>>,
    still: Arc<Mutex<StillLog>>,
}

fn harness_with(canvas: Canvas, tags: &[u8], advance: AdvancePolicy) -> Harness {
    let frames = tags
        .iter()
        .map(|&t| Frame::solid(canvas, [t, 0, 0, 255]).unwrap())
        .collect();
    let store = FrameStore::from_frames(frames).unwrap();
    let video = Arc::new(Mutex::new(VideoLog::default()));
    let still = Arc::new(Mutex::new(StillLog::default()));
    let stream = FrameStreamSource::new(
        store,
        Box::new(FakeVideo(video.clone())),
        Box::new(FakeStill(still.clone())),
        StreamOpts {
            canvas,
            fps: Fps::new(30, 1).unwrap(),
            advance,
        },
    )
    .unwrap();
    Harness {
        stream,
        video,
        still,
    }
}

fn harness(tags: &[u8]) -> Harness {
    harness_with(Canvas::new(8, 8), tags, AdvancePolicy::Always)
}

#[test]
fn cyclic_visit_order_for_small_loops() {
    for n in 1..=5u8 {
        let tags: Vec<u8> = (0..n).collect();
        let h = harness(&tags);
        assert_eq!(h.stream.position(), FrameIndex(0));

        let served: Vec<usize> = (0..=n)
            .map(|_| h.stream.pull("image/jpeg").unwrap().frame.0)
            .collect();
        let mut expected: Vec<usize> = (0..n as usize).collect();
        expected.push(0);
        assert_eq!(served, expected, "n = {n}");
    }
}

#[test]
fn three_frame_loop_serves_a_b_c_a_b_as_stills() {
    let (a, b, c) = (10u8, 20u8, 30u8);
    let h = harness_with(Canvas::new(640, 480), &[a, b, c], AdvancePolicy::Always);

    let mut served = Vec::new();
    for _ in 0..5 {
        let p = h.stream.pull("image/jpeg").unwrap();
        assert_eq!(p.format, OutputFormat::StillImage);
        assert_eq!(p.mime_type(), "image/jpeg");
        assert_eq!(p.canvas, Canvas::new(640, 480));
        assert!(p.keyframe);
        served.push(p.data[2]);
    }
    assert_eq!(served, vec![a, b, c, a, b]);
    assert_eq!(h.still.lock().unwrap().tags, vec![a, b, c, a, b]);
    assert_eq!(h.video.lock().unwrap().calls, 0);
}

#[test]
fn unsupported_hint_advances_without_touching_codecs() {
    let h = harness(&[1, 2, 3]);
    let err = h.stream.pull("bogus/format").unwrap_err();
    match err {
        LoopcamError::UnsupportedFormat { hint } => assert_eq!(hint, "bogus/format"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.stream.position(), FrameIndex(1));
    assert_eq!(h.video.lock().unwrap().calls, 0);
    assert!(h.still.lock().unwrap().tags.is_empty());

    for hint in ["", "image/png", "video/h265"] {
        assert!(matches!(
            h.stream.pull(hint),
            Err(LoopcamError::UnsupportedFormat { .. })
        ));
    }
    assert_eq!(h.stream.position(), FrameIndex(1));
    assert_eq!(h.stream.stats().unsupported, 4);
}

#[test]
fn video_pulls_reach_encoder_in_pull_order() {
    let h = harness(&[0, 1, 2, 3]);
    let mut served = Vec::new();
    for _ in 0..10 {
        let p = h.stream.pull("video/h264").unwrap();
        assert_eq!(p.format, OutputFormat::VideoCodec);
        served.push(p.frame.0 as u8);
    }
    let log = h.video.lock().unwrap();
    assert_eq!(log.calls, 10);
    assert_eq!(log.tags, served);
    assert_eq!(served, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
}

#[test]
fn one_frame_loop_with_two_video_pulls() {
    let h = harness(&[42]);
    let first = h.stream.pull("video/h264").unwrap();
    let second = h.stream.pull("video/h264").unwrap();

    assert_eq!(first.format, OutputFormat::VideoCodec);
    assert_eq!(second.format, OutputFormat::VideoCodec);
    assert!(first.keyframe);
    assert!(!second.keyframe);
    assert_eq!(first.frame, FrameIndex(0));
    assert_eq!(second.frame, FrameIndex(0));
    assert_eq!(h.video.lock().unwrap().calls, 2);
    assert_eq!(h.stream.video_frames_encoded(), Some(2));
}

#[test]
fn mixed_hints_share_one_cursor() {
    let h = harness(&[0, 1, 2]);
    assert_eq!(h.stream.pull("video/h264").unwrap().frame, FrameIndex(0));
    assert_eq!(h.stream.pull("image/jpeg").unwrap().frame, FrameIndex(1));
    assert!(h.stream.pull("text/plain").is_err());
    assert_eq!(h.stream.pull("video/h264").unwrap().frame, FrameIndex(0));

    assert_eq!(h.video.lock().unwrap().tags, vec![0, 0]);
    assert_eq!(h.still.lock().unwrap().tags, vec![1]);

    let stats = h.stream.stats();
    assert_eq!(stats.pulls, 4);
    assert_eq!(stats.video_payloads, 2);
    assert_eq!(stats.still_payloads, 1);
    assert_eq!(stats.unsupported, 1);
    assert_eq!(stats.encode_failures, 0);
}

#[test]
fn failed_video_encode_consumes_slot_and_forces_keyframe() {
    let h = harness(&[0, 1, 2]);
    h.video.lock().unwrap().fail_on_call = Some(2);

    h.stream.pull("video/h264").unwrap();
    let err = h.stream.pull("video/h264").unwrap_err();
    assert!(matches!(
        err,
        LoopcamError::EncodeFailed {
            frame: FrameIndex(1),
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert_eq!(h.stream.position(), FrameIndex(2));

    let next = h.stream.pull("video/h264").unwrap();
    assert_eq!(next.frame, FrameIndex(2));
    let log = h.video.lock().unwrap();
    assert_eq!(log.forced_keyframes, 1);
    assert_eq!(log.tags, vec![0, 2]);
    drop(log);
    assert_eq!(h.stream.stats().encode_failures, 1);
}

#[test]
fn on_success_policy_retries_the_same_frame() {
    let h = harness_with(Canvas::new(8, 8), &[0, 1, 2], AdvancePolicy::OnSuccess);
    assert_eq!(h.stream.advance_policy(), AdvancePolicy::OnSuccess);

    assert!(h.stream.pull("bogus/format").is_err());
    assert_eq!(h.stream.position(), FrameIndex(0));

    h.still.lock().unwrap().fail = true;
    assert!(matches!(
        h.stream.pull("image/jpeg"),
        Err(LoopcamError::EncodeFailed { .. })
    ));
    assert_eq!(h.stream.position(), FrameIndex(0));

    h.still.lock().unwrap().fail = false;
    assert_eq!(h.stream.pull("image/jpeg").unwrap().frame, FrameIndex(0));
    assert_eq!(h.stream.position(), FrameIndex(1));

    h.video.lock().unwrap().fail_on_call = Some(1);
    assert!(h.stream.pull("video/h264").is_err());
    assert_eq!(h.stream.position(), FrameIndex(1));
    assert_eq!(h.stream.pull("video/h264").unwrap().frame, FrameIndex(1));
    assert_eq!(h.stream.position(), FrameIndex(2));
}

#[test]
fn still_failure_under_always_policy_still_advances() {
    let h = harness(&[0, 1]);
    h.still.lock().unwrap().fail = true;
    assert!(h.stream.pull("image/jpeg").is_err());
    assert_eq!(h.stream.position(), FrameIndex(1));
}

#[test]
fn construction_rejects_mismatched_dimensions() {
    let store = FrameStore::from_frames(vec![
        Frame::solid(Canvas::new(4, 4), [0, 0, 0, 255]).unwrap(),
    ])
    .unwrap();
    let err = FrameStreamSource::new(
        store,
        Box::new(FakeVideo(Default::default())),
        Box::new(FakeStill(Default::default())),
        StreamOpts {
            canvas: Canvas::new(640, 480),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, LoopcamError::DimensionMismatch { .. }));
}

#[test]
fn closed_stream_rejects_pulls() {
    let h = harness(&[0, 1]);
    h.stream.pull("video/h264").unwrap();
    assert!(!h.stream.is_closed());

    h.stream.close();
    h.stream.close();
    assert!(h.stream.is_closed());
    assert_eq!(h.stream.video_frames_encoded(), None);
    assert!(matches!(h.stream.pull("image/jpeg"), Err(LoopcamError::Closed)));
    assert!(matches!(h.stream.pull("video/h264"), Err(LoopcamError::Closed)));
    assert_eq!(h.stream.position(), FrameIndex(1));
    assert_eq!(h.stream.stats().pulls, 1);
}

#[test]
fn cancellation_is_honored_before_selection_only() {
    let h = harness(&[0, 1]);
    let cancel = AtomicBool::new(true);
    assert!(matches!(
        h.stream.pull_cancellable("video/h264", &cancel),
        Err(LoopcamError::Cancelled)
    ));
    assert_eq!(h.stream.position(), FrameIndex(0));
    assert_eq!(h.video.lock().unwrap().calls, 0);

    cancel.store(false, Ordering::Release);
    let p = h.stream.pull_cancellable("video/h264", &cancel).unwrap();
    assert_eq!(p.frame, FrameIndex(0));
}

#[test]
fn concurrent_video_pulls_keep_one_total_order() {
    let h = harness(&[0, 1, 2, 3, 4]);
    let threads = 4;
    let per_thread = 25;

    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..per_thread {
                    h.stream.pull("video/h264").unwrap();
                }
            });
        }
    });

    let log = h.video.lock().unwrap();
    assert_eq!(log.calls, threads * per_thread);
    for (i, tag) in log.tags.iter().enumerate() {
        assert_eq!(*tag as usize, i % 5, "encode call {i} saw frame {tag}");
    }
}

#[test]
fn advertises_exactly_the_two_formats() {
    let h = harness(&[0]);
    assert_eq!(
        h.stream.supported_formats(),
        &[OutputFormat::VideoCodec, OutputFormat::StillImage]
    );
    assert_eq!(h.stream.frame_count(), 1);
    assert_eq!(h.stream.canvas(), Canvas::new(8, 8));
    assert_eq!(h.stream.fps(), Fps::new(30, 1).unwrap());
}

/// Video backend that panics mid-encode and flags when it is dropped.
struct PanicVideo(Arc<AtomicBool>);

impl VideoEncoder for PanicVideo {
    fn codec(&self) -> &'static str {
        "panic-video"
    }

    fn encode(&mut self, _frame: &Frame) -> anyhow::Result<AccessUnit> {
        panic!("encoder blew up");
    }

    fn force_keyframe(&mut self) {}
}

impl Drop for PanicVideo {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn panic_stream(dropped: &Arc<AtomicBool>) -> FrameStreamSource {
    let canvas = Canvas::new(8, 8);
    let frames = (0..2u8)
        .map(|t| Frame::solid(canvas, [t, 0, 0, 255]).unwrap())
        .collect();
    FrameStreamSource::new(
        FrameStore::from_frames(frames).unwrap(),
        Box::new(PanicVideo(dropped.clone())),
        Box::new(FakeStill(Arc::new(Mutex::new(StillLog::default())))),
        StreamOpts {
            canvas,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn poisoned_state_surfaces_as_error_not_panic() {
    let dropped = Arc::new(AtomicBool::new(false));
    let stream = panic_stream(&dropped);

    let joined = std::thread::scope(|s| s.spawn(|| stream.pull("video/h264")).join());
    assert!(joined.is_err());

    assert!(matches!(stream.pull("image/jpeg"), Err(LoopcamError::Other(_))));
    assert!(matches!(stream.pull("video/h264"), Err(LoopcamError::Other(_))));
    assert_eq!(stream.position(), FrameIndex(1));
    assert!(!stream.is_closed());

    stream.close();
    assert!(stream.is_closed());
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn dropping_an_open_stream_tears_down_the_session() {
    let dropped = Arc::new(AtomicBool::new(false));
    let stream = panic_stream(&dropped);
    stream.pull("image/jpeg").unwrap();
    assert!(!dropped.load(Ordering::SeqCst));

    drop(stream);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn dropping_a_poisoned_stream_does_not_panic() {
    let dropped = Arc::new(AtomicBool::new(false));
    let stream = panic_stream(&dropped);
    let joined = std::thread::scope(|s| s.spawn(|| stream.pull("video/h264")).join());
    assert!(joined.is_err());

    drop(stream);
    assert!(dropped.load(Ordering::SeqCst));
}
