//! Line reading for text scene formats.
//!
//! Exporters routinely write Latin-1 comments and material names, so lines
//! are decoded lossily instead of failing the whole file.

use std::io::{self, BufRead};

/// Lines of `reader` without their terminators. Invalid UTF-8 is replaced
/// with U+FFFD and logged; only I/O errors are returned.
pub fn lossy_lines<R: BufRead>(mut reader: R) -> impl Iterator<Item = io::Result<String>> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    std::iter::from_fn(move || {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                line_no += 1;
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = match String::from_utf8(std::mem::take(&mut buf)) {
                    Ok(line) => line,
                    Err(err) => {
                        log::debug!("Line {} is not valid UTF-8, decoded lossily", line_no);
                        String::from_utf8_lossy(err.as_bytes()).into_owned()
                    }
                };
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    })
}
