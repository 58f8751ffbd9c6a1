use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use anyhow::Context as _;
use tracing::debug;

use crate::foundation::core::{Fps, Frame, FrameShape};
use crate::foundation::error::{AnimError, AnimResult};
use crate::media::convert::frame_to_rgb8;
use crate::media::ffmpeg::{FfmpegEncoder, ensure_parent_dir};
use crate::media::pattern::NumberedPattern;
use crate::media::source::MediaKind;

/// File name pattern used when the sink path is a directory.
pub const DIRECTORY_PATTERN: &str = "%05d.png";

/// Append-only frame output: a video container or a directory of numbered images.
///
/// The container is finalized by [`FrameSink::finish`]; a sink dropped without finishing
/// (an aborted run) is still finalized so frames written so far remain readable.
pub enum FrameSink {
    /// One container file encoded through `ffmpeg`.
    Container(ContainerSink),
    /// One image file per appended frame.
    Directory(DirectorySink),
}

impl FrameSink {
    /// Create a sink for `path`.
    ///
    /// An existing directory (or a path ending in a separator, created on demand) writes
    /// `00000.png, 00001.png, ...`; a path containing `%` is used as the file pattern; anything
    /// else is a container whose format follows its extension.
    pub fn create(path: impl AsRef<Path>, fps: Fps, shape: FrameShape) -> AnimResult<Self> {
        let path = path.as_ref();
        let wants_dir = path.to_string_lossy().ends_with(['/', MAIN_SEPARATOR]);
        let sink = match MediaKind::of(path) {
            MediaKind::Directory => Self::Directory(DirectorySink::in_dir(path, shape)?),
            MediaKind::Container if wants_dir => {
                std::fs::create_dir_all(path)
                    .with_context(|| format!("create output directory '{}'", path.display()))?;
                Self::Directory(DirectorySink::in_dir(path, shape)?)
            }
            MediaKind::Pattern => Self::Directory(DirectorySink::with_pattern(path, shape)?),
            MediaKind::Container => Self::Container(ContainerSink {
                encoder: FfmpegEncoder::spawn(path, shape.width, shape.height, fps)?,
                shape,
                written: 0,
            }),
        };
        debug!(path = %path.display(), fps = fps.as_f64(), "created frame sink");
        Ok(sink)
    }

    /// Append one frame after every previously appended frame.
    pub fn append(&mut self, frame: &Frame) -> AnimResult<()> {
        match self {
            Self::Container(c) => c.append(frame),
            Self::Directory(d) => d.append(frame),
        }
    }

    /// Number of frames appended so far.
    pub fn frames_written(&self) -> u64 {
        match self {
            Self::Container(c) => c.written,
            Self::Directory(d) => d.next_index,
        }
    }

    /// Finalize the output and return the number of frames written.
    pub fn finish(self) -> AnimResult<u64> {
        let written = self.frames_written();
        if let Self::Container(mut c) = self {
            c.encoder.finish()?;
        }
        Ok(written)
    }
}

/// Container variant state.
pub struct ContainerSink {
    encoder: FfmpegEncoder,
    shape: FrameShape,
    written: u64,
}

impl ContainerSink {
    fn append(&mut self, frame: &Frame) -> AnimResult<()> {
        check_shape(self.shape, frame)?;
        self.encoder.write_frame(&frame_to_rgb8(frame))?;
        self.written += 1;
        Ok(())
    }
}

/// Directory variant state.
pub struct DirectorySink {
    pattern: NumberedPattern,
    shape: FrameShape,
    next_index: u64,
}

impl DirectorySink {
    fn in_dir(dir: &Path, shape: FrameShape) -> AnimResult<Self> {
        let pattern = dir.join(DIRECTORY_PATTERN);
        Self::with_pattern(&pattern, shape)
    }

    fn with_pattern(pattern: &Path, shape: FrameShape) -> AnimResult<Self> {
        ensure_parent_dir(pattern)?;
        Ok(Self {
            pattern: NumberedPattern::parse(&pattern.to_string_lossy())?,
            shape,
            next_index: 0,
        })
    }

    /// Path the next appended frame will be written to.
    pub fn next_path(&self) -> PathBuf {
        self.pattern.path_for(self.next_index)
    }

    fn append(&mut self, frame: &Frame) -> AnimResult<()> {
        check_shape(self.shape, frame)?;
        let path = self.next_path();
        frame_to_rgb8(frame)
            .save(&path)
            .with_context(|| format!("write frame '{}'", path.display()))?;
        self.next_index += 1;
        Ok(())
    }
}

fn check_shape(shape: FrameShape, frame: &Frame) -> AnimResult<()> {
    if !shape.matches(frame) {
        return Err(AnimError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            shape.width,
            shape.height
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/sink.rs"]
mod tests;
