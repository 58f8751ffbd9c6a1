//! Frame sources and sinks over video containers, image directories and numbered patterns.

pub(crate) mod convert;
pub(crate) mod ffmpeg;
pub(crate) mod pattern;
pub(crate) mod sink;
pub(crate) mod source;
