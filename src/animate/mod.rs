pub(crate) mod bidirectional;
pub(crate) mod generator;
pub(crate) mod motion;
pub(crate) mod search;
