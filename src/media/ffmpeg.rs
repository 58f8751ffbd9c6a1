//! Video container IO through the system `ffmpeg`/`ffprobe` binaries.
//!
//! Frames cross the process boundary as tightly packed `rgb24` rawvideo on stdin/stdout.

use std::io::{BufReader, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use tracing::{debug, warn};

use crate::foundation::core::Fps;
use crate::foundation::error::{AnimError, AnimResult};

/// Basic metadata about a video container.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    /// Displayed width in pixels, after applying rotation metadata.
    pub width: u32,
    /// Displayed height in pixels, after applying rotation metadata.
    pub height: u32,
    /// Frame rate, [`Fps::DEFAULT`] when the container does not report one.
    pub fps: Fps,
    /// Frame count from stream metadata or `duration * fps`, when determinable.
    pub frame_count: Option<u64>,
}

/// Probe container metadata through `ffprobe`.
pub fn probe_video(path: &Path) -> AnimResult<VideoInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| AnimError::io(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(AnimError::io(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

pub(crate) fn parse_probe_json(json: &[u8]) -> AnimResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        nb_frames: Option<String>,
        duration: Option<String>,
        tags: Option<ProbeTags>,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeTags {
        rotate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| AnimError::io(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| AnimError::io("no video stream found"))?;
    let width = stream
        .width
        .ok_or_else(|| AnimError::io("missing video width from ffprobe"))?;
    let height = stream
        .height
        .ok_or_else(|| AnimError::io("missing video height from ffprobe"))?;

    // ffmpeg autorotates on decode, so quarter turns swap the delivered size.
    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .or_else(|| {
            stream
                .tags
                .as_ref()
                .and_then(|t| t.rotate.as_deref())
                .and_then(|r| r.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    let (width, height) = if (rotation.round() as i64).rem_euclid(180) == 90 {
        (height, width)
    } else {
        (width, height)
    };

    let fps = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(Fps::parse_rational)
        .unwrap_or_default();

    let duration = stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| duration.map(|d| (d * fps.as_f64()).floor() as u64));

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

fn scale_filter(info: &VideoInfo) -> String {
    format!("scale={}:{}", info.width, info.height)
}

/// Streaming decoder: one `ffmpeg` child writing rawvideo frames to a pipe.
///
/// Dropping the decoder before the stream ends kills and reaps the child.
pub struct FfmpegDecoder {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl FfmpegDecoder {
    /// Spawn `ffmpeg` decoding `path` at its displayed size `info.width x info.height`.
    ///
    /// The output size is pinned with a scale filter so every frame on the pipe has exactly
    /// the stride the reader expects.
    pub fn spawn(path: &Path, info: &VideoInfo) -> AnimResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-vf"])
            .arg(scale_filter(info))
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AnimError::io(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnimError::io("failed to open ffmpeg stdout (unexpected)"))?;
        let stderr_drain = child.stderr.take().map(spawn_drain);

        Ok(Self {
            path: path.to_path_buf(),
            width: info.width,
            height: info.height,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            stderr_drain,
        })
    }

    /// Next decoded frame, or `None` once the stream is exhausted.
    pub fn next_frame(&mut self) -> AnimResult<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.width as usize * self.height as usize * 3];
        let filled = read_full(stdout, &mut buf)
            .map_err(|e| AnimError::io(format!("failed to read from ffmpeg: {e}")))?;
        if filled == 0 {
            self.stdout = None;
            self.wait()?;
            return Ok(None);
        }
        if filled < buf.len() {
            self.stdout = None;
            self.wait()?;
            return Err(AnimError::io(format!(
                "truncated frame from '{}': got {filled} of {} bytes",
                self.path.display(),
                buf.len()
            )));
        }

        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| AnimError::io("decoded frame buffer has the wrong size"))
    }

    fn wait(&mut self) -> AnimResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| AnimError::io(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = join_drain(self.stderr_drain.take())?;
        if !status.success() {
            return Err(AnimError::io(format!(
                "ffmpeg decode of '{}' exited with status {status}: {}",
                self.path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            // Early termination: the consumer stopped pulling frames.
            let _ = child.kill();
            let _ = child.wait();
            debug!(path = %self.path.display(), "stopped ffmpeg decoder early");
        }
        let _ = join_drain(self.stderr_drain.take());
    }
}

/// Streaming encoder: one `ffmpeg` child reading rawvideo frames from a pipe.
pub struct FfmpegEncoder {
    out_path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl FfmpegEncoder {
    /// Spawn `ffmpeg` writing `out_path` from `width x height` frames at `fps`.
    pub fn spawn(out_path: &Path, width: u32, height: u32, fps: Fps) -> AnimResult<Self> {
        if width == 0 || height == 0 {
            return Err(AnimError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        let h264 = wants_h264(out_path);
        if h264 && (!width.is_multiple_of(2) || !height.is_multiple_of(2)) {
            return Err(AnimError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        ensure_parent_dir(out_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{width}x{height}"),
            // Input frame rate goes before `-i` for rawvideo.
            "-r",
            &format!("{}/{}", fps.num, fps.den),
            "-i",
            "pipe:0",
            "-an",
        ]);
        if h264 {
            cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
            if has_extension(out_path, &["mp4", "mov", "m4v"]) {
                cmd.args(["-movflags", "+faststart"]);
            }
        }
        cmd.arg(out_path);

        let mut child = cmd.spawn().map_err(|e| {
            AnimError::io(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnimError::io("failed to open ffmpeg stdin (unexpected)"))?;
        let stderr_drain = child.stderr.take().map(spawn_drain);

        Ok(Self {
            out_path: out_path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain,
        })
    }

    /// Write one frame.
    pub fn write_frame(&mut self, frame: &RgbImage) -> AnimResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(AnimError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AnimError::io("ffmpeg sink is already finalized"));
        };
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| AnimError::io(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    /// Close the pipe and wait for `ffmpeg` to finalize the container.
    pub fn finish(&mut self) -> AnimResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| AnimError::io(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr = join_drain(self.stderr_drain.take())?;
        if !status.success() {
            return Err(AnimError::io(format!(
                "ffmpeg exited with status {status} writing '{}': {}",
                self.out_path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some()
            && let Err(e) = self.finish()
        {
            warn!(path = %self.out_path.display(), error = %e, "ffmpeg sink finalize failed");
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> AnimResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn wants_h264(path: &Path) -> bool {
    has_extension(path, &["mp4", "mov", "m4v", "mkv"])
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn spawn_drain<R: Read + Send + 'static>(mut r: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> AnimResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| AnimError::io("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| AnimError::io(format!("ffmpeg stderr read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

/// Fill `buf` from `r`, returning how many bytes were read before EOF.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
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

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
