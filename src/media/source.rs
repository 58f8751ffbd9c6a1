use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::debug;

use crate::foundation::core::{Fps, Frame, FrameShape};
use crate::foundation::error::{AnimError, AnimResult};
use crate::media::convert::{load_image, normalize_frame};
use crate::media::ffmpeg::{FfmpegDecoder, VideoInfo, probe_video};
use crate::media::pattern::NumberedPattern;

/// Image encodings accepted in directory sources (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Lowest first index probed for pattern sources, matching ffmpeg's image2 demuxer.
const PATTERN_START_RANGE: u64 = 5;

/// Structural category of a source or sink path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// A single multi-frame container (video file).
    Container,
    /// A directory of individually numbered images.
    Directory,
    /// A printf-style numbered path pattern.
    Pattern,
}

impl MediaKind {
    /// Classify `path`: existing directory, `%` pattern, or container file.
    pub fn of(path: &Path) -> Self {
        if path.is_dir() {
            Self::Directory
        } else if path.to_string_lossy().contains('%') {
            Self::Pattern
        } else {
            Self::Container
        }
    }
}

/// A finite, forward-only sequence of decoded frames from a video, a directory, or a pattern.
///
/// Iteration yields raw decoded images; use [`FrameSource::frames`] for normalized [`Frame`]s.
/// Restarting means opening the path again.
pub enum FrameSource {
    /// Video container decoded through `ffmpeg`; the decoder is spawned on open.
    Container(ContainerFrames),
    /// Sorted image files of a directory, decoded lazily one per item.
    Directory(DirectoryFrames),
    /// Numbered files resolved from a pattern, decoded lazily one per item.
    Pattern(PatternFrames),
}

impl FrameSource {
    /// Open `path`, choosing the variant by [`MediaKind::of`].
    pub fn open(path: impl AsRef<Path>) -> AnimResult<Self> {
        let path = path.as_ref();
        let source = match MediaKind::of(path) {
            MediaKind::Directory => Self::Directory(DirectoryFrames::open(path)?),
            MediaKind::Pattern => Self::Pattern(PatternFrames::open(path)?),
            MediaKind::Container => Self::Container(ContainerFrames::open(path)?),
        };
        debug!(
            path = %path.display(),
            kind = ?source.kind(),
            len = ?source.len(),
            "opened frame source"
        );
        Ok(source)
    }

    /// Variant of this source.
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Container(_) => MediaKind::Container,
            Self::Directory(_) => MediaKind::Directory,
            Self::Pattern(_) => MediaKind::Pattern,
        }
    }

    /// Total frame count when determinable. Pattern sources report `None`.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Container(c) => c.info.frame_count,
            Self::Directory(d) => Some(d.files.len() as u64),
            Self::Pattern(_) => None,
        }
    }

    /// Return `true` when the source is known to hold no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Frame rate metadata, defaulting to 30 when the source carries none.
    pub fn fps(&self) -> Fps {
        match self {
            Self::Container(c) => c.info.fps,
            Self::Directory(_) | Self::Pattern(_) => Fps::DEFAULT,
        }
    }

    /// Lazily normalize every frame to `shape`.
    pub fn frames(self, shape: FrameShape) -> impl Iterator<Item = AnimResult<Frame>> {
        self.map(move |img| img.map(|img| normalize_frame(&img, shape)))
    }
}

impl Iterator for FrameSource {
    type Item = AnimResult<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Container(c) => c.next(),
            Self::Directory(d) => d.next(),
            Self::Pattern(p) => p.next(),
        }
    }
}

/// Container variant state.
pub struct ContainerFrames {
    info: VideoInfo,
    decoder: FfmpegDecoder,
}

impl ContainerFrames {
    fn open(path: &Path) -> AnimResult<Self> {
        if !path.exists() {
            return Err(AnimError::NotFound(path.to_path_buf()));
        }
        let info = probe_video(path)?;
        let decoder = FfmpegDecoder::spawn(path, &info)?;
        Ok(Self { info, decoder })
    }

    /// Probed container metadata.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next(&mut self) -> Option<AnimResult<DynamicImage>> {
        self.decoder
            .next_frame()
            .map(|f| f.map(DynamicImage::ImageRgb8))
            .transpose()
    }
}

/// Directory variant state.
pub struct DirectoryFrames {
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectoryFrames {
    fn open(dir: &Path) -> AnimResult<Self> {
        use anyhow::Context as _;

        let mut names = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("list image directory '{}'", dir.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("list image directory '{}'", dir.display()))?;
            if entry.path().is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(Self {
            files: select_image_files(names)
                .into_iter()
                .map(|n| dir.join(n))
                .collect(),
            next: 0,
        })
    }

    /// Files this source will read, in order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn next(&mut self) -> Option<AnimResult<DynamicImage>> {
        let path = self.files.get(self.next)?;
        self.next += 1;
        Some(load_image(path))
    }
}

/// Sort names lexicographically and keep those with an allowed image extension.
pub fn select_image_files(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.retain(|n| {
        Path::new(n)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
    });
    names
}

/// Pattern variant state.
pub struct PatternFrames {
    pattern: NumberedPattern,
    next: Option<u64>,
}

impl PatternFrames {
    fn open(path: &Path) -> AnimResult<Self> {
        let pattern = NumberedPattern::parse(&path.to_string_lossy())?;
        let next = (0..PATTERN_START_RANGE).find(|i| pattern.path_for(*i).is_file());
        if next.is_none() {
            debug!(pattern = %path.display(), "pattern matched no files");
        }
        Ok(Self { pattern, next })
    }

    fn next(&mut self) -> Option<AnimResult<DynamicImage>> {
        let index = self.next?;
        let path = self.pattern.path_for(index);
        if !path.is_file() {
            self.next = None;
            return None;
        }
        self.next = Some(index + 1);
        Some(load_image(&path))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/source.rs"]
mod tests;
