use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::encode::still::StillImageCodec;
use crate::encode::video::{VideoEncoder, VideoEncoderSession};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{LoopcamError, LoopcamResult};
use crate::negotiate::{FormatNegotiator, Negotiated, OutputFormat};
use crate::source::cursor::CyclicIndex;
use crate::source::frame::Frame;
use crate::source::store::FrameStore;
use crate::stream::payload::{EncodedPayload, StreamStats};

/// When the cursor moves past a frame whose pull failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Every pull consumes a slot, whatever its outcome. A client that never sends a usable hint
    /// still sees the loop move, and transient encode errors never stall it.
    #[default]
    Always,
    /// Only successful pulls advance; a failed pull leaves the same frame up for a retry.
    OnSuccess,
}

/// Options for [`FrameStreamSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamOpts {
    /// Dimensions every frame and the encoder session share.
    pub canvas: Canvas,
    /// Encoder frame rate.
    pub fps: Fps,
    /// Cursor behavior on failed pulls.
    pub advance: AdvancePolicy,
}

struct StreamState {
    cursor: CyclicIndex,
    /// `None` once the stream is closed.
    video: Option<VideoEncoderSession>,
}

#[derive(Default)]
struct Counters {
    pulls: AtomicU64,
    video_payloads: AtomicU64,
    still_payloads: AtomicU64,
    unsupported: AtomicU64,
    encode_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StreamStats {
        StreamStats {
            pulls: self.pulls.load(Ordering::Relaxed),
            video_payloads: self.video_payloads.load(Ordering::Relaxed),
            still_payloads: self.still_payloads.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Looping frame source that encodes each pulled frame in the format the caller asks for.
///
/// Every pull serves the frame under the cursor, then the cursor moves on (see
/// [`AdvancePolicy`]). The cursor and the video encoder session share one lock: a video pull
/// holds it from frame selection through encode, so access units come out in exactly the order
/// frames were selected. Still pulls only hold the lock while selecting and advancing and run the
/// JPEG encode outside it, unless [`AdvancePolicy::OnSuccess`] needs the outcome before moving.
pub struct FrameStreamSource {
    store: FrameStore,
    negotiator: FormatNegotiator,
    still: Box<dyn StillImageCodec>,
    state: Mutex<StreamState>,
    counters: Counters,
    opts: StreamOpts,
}

impl FrameStreamSource {
    /// Assemble a stream from a loaded store and codec backends.
    ///
    /// Fails with [`LoopcamError::DimensionMismatch`] when the store's frames do not match
    /// `opts.canvas`; no stream is returned in that case.
    pub fn new(
        store: FrameStore,
        video: Box<dyn VideoEncoder>,
        still: Box<dyn StillImageCodec>,
        opts: StreamOpts,
    ) -> LoopcamResult<Self> {
        Fps::new(opts.fps.num, opts.fps.den)?;
        if store.canvas() != opts.canvas {
            return Err(LoopcamError::DimensionMismatch {
                expected: opts.canvas,
                got: store.canvas(),
            });
        }

        let cursor = CyclicIndex::new(store.len())?;
        let session = VideoEncoderSession::new(opts.canvas, opts.fps, video);
        tracing::debug!(
            frames = store.len(),
            canvas = %opts.canvas,
            video = session.codec(),
            still = still.codec(),
            advance = ?opts.advance,
            "frame stream ready"
        );

        Ok(Self {
            store,
            negotiator: FormatNegotiator::new(),
            still,
            state: Mutex::new(StreamState {
                cursor,
                video: Some(session),
            }),
            counters: Counters::default(),
            opts,
        })
    }

    /// Load the configured source and build the default codecs (OpenH264 + JPEG).
    #[cfg(feature = "openh264")]
    pub fn open(cfg: &crate::config::StreamConfig) -> LoopcamResult<Self> {
        use crate::encode::h264::OpenH264Encoder;
        use crate::encode::still::JpegCodec;

        cfg.validate()?;
        let store = FrameStore::load(&cfg.source)?;
        let canvas = cfg.canvas();
        if store.canvas() != canvas {
            return Err(LoopcamError::DimensionMismatch {
                expected: canvas,
                got: store.canvas(),
            });
        }
        let video = OpenH264Encoder::new(canvas, cfg.fps, &cfg.h264)?;
        let still = JpegCodec::new(cfg.jpeg_quality)?;
        Self::new(store, Box::new(video), Box::new(still), cfg.stream_opts())
    }

    /// Serve the frame under the cursor in the format named by `hint`.
    ///
    /// The cursor advances once per pull according to the [`AdvancePolicy`]; under the default
    /// policy a rejected hint or a failed encode still consumes the slot.
    pub fn pull(&self, hint: &str) -> LoopcamResult<EncodedPayload> {
        let negotiated = self.negotiator.classify(hint);

        let mut state = self.lock_for_pull()?;
        if state.video.is_none() {
            return Err(LoopcamError::Closed);
        }

        let idx = state.cursor.current();
        let frame = self.frame_at(idx)?;
        Counters::bump(&self.counters.pulls);
        let always = self.opts.advance == AdvancePolicy::Always;
        if always {
            state.cursor.advance();
        }

        match negotiated {
            Negotiated::Unsupported => {
                Counters::bump(&self.counters.unsupported);
                tracing::debug!(frame = %idx, hint, "rejected unsupported format hint");
                Err(LoopcamError::UnsupportedFormat {
                    hint: hint.to_string(),
                })
            }
            Negotiated::Video => {
                let result = match state.video.as_mut() {
                    Some(session) => session.encode(idx, &frame),
                    None => Err(LoopcamError::Closed),
                };
                if !always && result.is_ok() {
                    state.cursor.advance();
                }
                drop(state);

                let unit = result.inspect_err(|_| {
                    Counters::bump(&self.counters.encode_failures);
                })?;
                Counters::bump(&self.counters.video_payloads);
                Ok(self.payload(
                    OutputFormat::VideoCodec,
                    idx,
                    &frame,
                    unit.data,
                    unit.keyframe,
                ))
            }
            Negotiated::Still => {
                let result = if always {
                    drop(state);
                    self.still.encode(idx, &frame)
                } else {
                    let result = self.still.encode(idx, &frame);
                    if result.is_ok() {
                        state.cursor.advance();
                    }
                    result
                };

                let data = result.inspect_err(|e| {
                    Counters::bump(&self.counters.encode_failures);
                    tracing::warn!(frame = %idx, error = %e, "still encode failed");
                })?;
                Counters::bump(&self.counters.still_payloads);
                Ok(self.payload(OutputFormat::StillImage, idx, &frame, data, true))
            }
        }
    }

    /// [`Self::pull`], unless `cancel` is already set.
    ///
    /// Cancellation is only observed before frame selection; once a frame is selected the pull
    /// runs to completion. A cancelled pull leaves the cursor where it was.
    pub fn pull_cancellable(
        &self,
        hint: &str,
        cancel: &AtomicBool,
    ) -> LoopcamResult<EncodedPayload> {
        if cancel.load(Ordering::Acquire) {
            return Err(LoopcamError::Cancelled);
        }
        self.pull(hint)
    }

    /// Formats this stream can serve, exactly.
    pub fn supported_formats(&self) -> &'static [OutputFormat] {
        self.negotiator.supported()
    }

    /// Frame the next pull will serve.
    pub fn position(&self) -> FrameIndex {
        self.lock_any().cursor.current()
    }

    /// Number of frames in the loop.
    pub fn frame_count(&self) -> usize {
        self.store.len()
    }

    /// Frame dimensions.
    pub fn canvas(&self) -> Canvas {
        self.opts.canvas
    }

    /// Encoder frame rate.
    pub fn fps(&self) -> Fps {
        self.opts.fps
    }

    /// Cursor policy in effect.
    pub fn advance_policy(&self) -> AdvancePolicy {
        self.opts.advance
    }

    /// Pull counters so far.
    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    /// Access units the video session has produced, or `None` once closed.
    pub fn video_frames_encoded(&self) -> Option<u64> {
        self.lock_any()
            .video
            .as_ref()
            .map(VideoEncoderSession::frames_encoded)
    }

    /// Return `true` once [`Self::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.lock_any().video.is_none()
    }

    /// Tear down the encoder session. Later pulls fail with [`LoopcamError::Closed`].
    ///
    /// Takes the pull lock, so it waits for an in-flight video pull to finish. Closing twice is a
    /// no-op.
    pub fn close(&self) {
        let mut state = self.lock_any();
        if let Some(session) = state.video.take() {
            tracing::info!(
                frames_encoded = session.frames_encoded(),
                failures = session.failures(),
                "frame stream closed"
            );
        }
    }

    fn frame_at(&self, idx: FrameIndex) -> LoopcamResult<Arc<Frame>> {
        self.store.get(idx).cloned().ok_or_else(|| {
            LoopcamError::Other(anyhow::anyhow!(
                "cursor {idx} outside frame store of {} frames",
                self.store.len()
            ))
        })
    }

    fn payload(
        &self,
        format: OutputFormat,
        idx: FrameIndex,
        frame: &Frame,
        data: Vec<u8>,
        keyframe: bool,
    ) -> EncodedPayload {
        tracing::trace!(frame = %idx, %format, bytes = data.len(), keyframe, "served frame");
        EncodedPayload {
            format,
            data,
            canvas: frame.canvas(),
            frame: idx,
            keyframe,
        }
    }

    /// Lock for a pull. A poisoned lock means an encode panicked mid-call and the encoder's
    /// reference chain can no longer be trusted.
    fn lock_for_pull(&self) -> LoopcamResult<MutexGuard<'_, StreamState>> {
        self.state.lock().map_err(|_| {
            LoopcamError::Other(anyhow::anyhow!(
                "frame stream state poisoned by a panicked pull"
            ))
        })
    }

    fn lock_any(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FrameStreamSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FrameStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStreamSource")
            .field("frames", &self.store.len())
            .field("opts", &self.opts)
            .field("still", &self.still.codec())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/source.rs"]
mod tests;
