use std::path::Path;

use crate::foundation::core::Canvas;
use crate::foundation::error::{LoopcamError, LoopcamResult};

/// Basic metadata about a source clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ClipInfo {
    /// Container index of the video stream that gets decoded.
    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    pub(crate) stream_index: usize,
    /// Native frame size of that stream.
    pub(crate) canvas: Canvas,
}

/// Probe clip metadata through `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn probe_clip(source_path: &Path) -> LoopcamResult<ClipInfo> {
    let out = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(source_path)
        .output()
        .map_err(|e| {
            LoopcamError::source_unreadable(source_path, format!("failed to run ffprobe: {e}"))
        })?;
    if !out.status.success() {
        return Err(LoopcamError::source_unreadable(
            source_path,
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }

    parse_probe_json(&out.stdout)
        .map_err(|reason| LoopcamError::source_unreadable(source_path, reason))
}

/// Pick the first real video stream from `ffprobe -show_streams` JSON.
///
/// Attached pictures (cover art) are reported as video streams too and are skipped.
#[cfg(feature = "media-ffmpeg")]
fn parse_probe_json(json: &[u8]) -> Result<ClipInfo, String> {
    #[derive(serde::Deserialize, Default)]
    struct ProbeDisposition {
        #[serde(default)]
        attached_pic: u8,
    }
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        index: usize,
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        #[serde(default)]
        disposition: ProbeDisposition,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
    }

    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| format!("ffprobe json parse failed: {e}"))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0)
        .ok_or_else(|| "no video stream found".to_string())?;
    let (Some(width), Some(height)) = (video_stream.width, video_stream.height) else {
        return Err("missing video dimensions from ffprobe".to_string());
    };

    Ok(ClipInfo {
        stream_index: video_stream.index,
        canvas: Canvas::new(width, height),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe clip metadata through `ffprobe`.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
pub(crate) fn probe_clip(source_path: &Path) -> LoopcamResult<ClipInfo> {
    Err(LoopcamError::source_unreadable(
        source_path,
        "clip sources require the 'media-ffmpeg' feature",
    ))
}

/// Decode every frame of the clip (up to `max_frames`) as RGBA8 buffers in presentation order.
///
/// Frames are read off ffmpeg's stdout one at a time, so only the decoded frames stay resident.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn decode_clip_rgba8(
    source_path: &Path,
    info: ClipInfo,
    max_frames: Option<usize>,
) -> LoopcamResult<Vec<Vec<u8>>> {
    use std::io::Read as _;

    let frame_len = info.canvas.rgba8_len();
    if frame_len == 0 {
        return Err(LoopcamError::source_unreadable(
            source_path,
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }

    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"]).arg(source_path);
    cmd.args(["-map", &format!("0:{}", info.stream_index)]);
    if let Some(n) = max_frames {
        cmd.args(["-frames:v", &n.to_string()]);
    }
    cmd.args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        LoopcamError::source_unreadable(
            source_path,
            format!("failed to run ffmpeg for video decode: {e}"),
        )
    })?;
    let Some(mut stdout) = child.stdout.take() else {
        return Err(LoopcamError::source_unreadable(
            source_path,
            "ffmpeg stdout was not captured",
        ));
    };

    let mut frames = Vec::new();
    let trailing = loop {
        let mut buf = vec![0u8; frame_len];
        let filled = match read_full(&mut stdout, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(LoopcamError::source_unreadable(
                    source_path,
                    format!("read ffmpeg output: {e}"),
                ));
            }
        };
        if filled < frame_len {
            break filled;
        }
        frames.push(buf);
    };
    drop(stdout);

    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    let status = child.wait().map_err(|e| {
        LoopcamError::source_unreadable(source_path, format!("wait for ffmpeg: {e}"))
    })?;
    if !status.success() {
        return Err(LoopcamError::source_unreadable(
            source_path,
            format!("ffmpeg video decode failed: {}", stderr.trim()),
        ));
    }
    if trailing != 0 {
        return Err(LoopcamError::source_unreadable(
            source_path,
            format!(
                "decoded video has invalid size: {trailing} trailing bytes \
                 after {} frames of {frame_len}",
                frames.len()
            ),
        ));
    }

    Ok(frames)
}

/// Fill `buf` from `r`, stopping early only at EOF. Returns the number of bytes read.
#[cfg(feature = "media-ffmpeg")]
fn read_full(r: &mut impl std::io::Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Decode every frame of the clip as RGBA8 buffers.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
pub(crate) fn decode_clip_rgba8(
    source_path: &Path,
    _info: ClipInfo,
    _max_frames: Option<usize>,
) -> LoopcamResult<Vec<Vec<u8>>> {
    Err(LoopcamError::source_unreadable(
        source_path,
        "clip sources require the 'media-ffmpeg' feature",
    ))
}

/// Return `true` when both `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        std::process::Command::new(tool)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

// End-to-end decoding is covered by `tests/clip_source.rs`, which skips when the tools are
// unavailable.
#[cfg(all(test, feature = "media-ffmpeg"))]
#[path = "../../tests/unit/source/media.rs"]
mod tests;
