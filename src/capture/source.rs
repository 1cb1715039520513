//! Sample sources feeding the aggregation table.
//!
//! The live tracing session is platform specific and lives outside this
//! crate. Anything that can hand out samples one by one implements
//! [`SampleSource`]; the crate ships a replay source for recorded streams and
//! an in-memory source.

use super::sample::{parse_sample_line, Sample};
use crate::utils::error::SampleError;
use log::{debug, info};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Producer side of the capture boundary
///
/// **Public** - implemented by every capture backend
pub trait SampleSource: Send {
    /// Next sample, `Ok(None)` once the source is exhausted
    ///
    /// A malformed sample is reported as an error; the source stays usable
    /// and the following call moves on to the next sample.
    fn next_sample(&mut self) -> Result<Option<Sample>, SampleError>;
}

/// Replays samples recorded in the line format of [`parse_sample_line`]
pub struct ReplaySource<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead + Send> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl ReplaySource<Box<dyn BufRead + Send>> {
    /// Open a recorded stream, `-` meaning stdin
    ///
    /// **Public** - used by the report command
    ///
    /// # Errors
    /// * `SampleError::IoError` - File cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SampleError> {
        let path = path.as_ref();

        let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
            info!("Reading samples from stdin");
            Box::new(BufReader::new(io::stdin()))
        } else {
            info!("Reading samples from: {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        };

        Ok(Self::new(reader))
    }
}

impl<R: BufRead + Send> SampleSource for ReplaySource<R> {
    fn next_sample(&mut self) -> Result<Option<Sample>, SampleError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                debug!("Sample stream ended after {} lines", self.line_number);
                return Ok(None);
            }
            self.line_number += 1;

            if let Some(sample) = parse_sample_line(&self.buffer, self.line_number)? {
                return Ok(Some(sample));
            }
        }
    }
}

/// In-memory source, drained front to back
#[derive(Debug, Default)]
pub struct MemorySource {
    samples: VecDeque<Sample>,
}

impl MemorySource {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl SampleSource for MemorySource {
    fn next_sample(&mut self) -> Result<Option<Sample>, SampleError> {
        Ok(self.samples.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_replay_skips_comments_and_blank_lines() {
        let input = "# header\n\n100 0xa;0xb\n5\n";
        let mut source = ReplaySource::new(Cursor::new(input));

        assert_eq!(
            source.next_sample().unwrap(),
            Some(Sample::new(100, vec![0xa, 0xb]))
        );
        assert_eq!(source.next_sample().unwrap(), Some(Sample::new(5, vec![])));
        assert_eq!(source.next_sample().unwrap(), None);
        assert_eq!(source.line_number(), 4);
    }

    #[test]
    fn test_replay_recovers_after_bad_line() {
        let input = "oops\n7 0x1\n";
        let mut source = ReplaySource::new(Cursor::new(input));

        assert!(source.next_sample().is_err());
        assert_eq!(source.next_sample().unwrap(), Some(Sample::new(7, vec![1])));
    }

    #[test]
    fn test_replay_handles_crlf() {
        let mut source = ReplaySource::new(Cursor::new("3 0x10\r\n"));
        assert_eq!(source.next_sample().unwrap(), Some(Sample::new(3, vec![0x10])));
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let mut source = MemorySource::new(vec![Sample::new(1, vec![1]), Sample::new(2, vec![2])]);

        assert_eq!(source.next_sample().unwrap().unwrap().process_id, 1);
        assert_eq!(source.next_sample().unwrap().unwrap().process_id, 2);
        assert!(source.next_sample().unwrap().is_none());
    }
}
