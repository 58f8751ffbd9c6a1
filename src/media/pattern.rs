use std::path::PathBuf;

use crate::foundation::error::{AnimError, AnimResult};

/// A printf-style numbered path such as `frames/%05d.png`.
///
/// Exactly one `%d`/`%Nd`/`%0Nd` token is supported; `%%` stands for a literal `%`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberedPattern {
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
}

impl NumberedPattern {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> AnimResult<Self> {
        let invalid = |why: &str| AnimError::validation(format!("path pattern '{pattern}': {why}"));

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut token: Option<(usize, bool)> = None;

        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            let out = if token.is_some() {
                &mut suffix
            } else {
                &mut prefix
            };
            if c != '%' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }
            if token.is_some() {
                return Err(invalid("only one numeric token is allowed"));
            }

            let zero_pad = chars.peek() == Some(&'0');
            if zero_pad {
                chars.next();
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            if chars.next() != Some('d') {
                return Err(invalid("expected a '%d' style token"));
            }
            let width = if digits.is_empty() {
                0
            } else {
                digits.parse().map_err(|_| invalid("bad field width"))?
            };
            token = Some((width, zero_pad));
        }

        let (width, zero_pad) = token.ok_or_else(|| invalid("no '%d' token"))?;
        Ok(Self {
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Path for frame `index`.
    pub fn path_for(&self, index: u64) -> PathBuf {
        let num = if self.zero_pad {
            format!("{index:0width$}", width = self.width)
        } else {
            format!("{index:width$}", width = self.width)
        };
        PathBuf::from(format!("{}{num}{}", self.prefix, self.suffix))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/pattern.rs"]
mod tests;
