//! Stack samples and the line-oriented replay format.
//!
//! Format: one sample per line, `<pid> [<addr>;<addr>;...]`
//!
//! Example: "4242 0x7f10a0;0x7f10b4;0x401000"
//! This means: process 4242 was sampled with a three-frame stack, leaf first.
//! A line holding only a pid is a zero-frame stack. Blank lines and lines
//! starting with `#` carry no sample.

use crate::utils::error::SampleError;

/// One observed call stack
///
/// **Public** - handed from a capture source to the aggregation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Process the stack was captured in
    pub process_id: i32,

    /// Frame addresses, leaf first
    pub addresses: Vec<u64>,
}

impl Sample {
    /// Create a new sample
    ///
    /// **Public** - constructor
    pub fn new(process_id: i32, addresses: Vec<u64>) -> Self {
        Self {
            process_id,
            addresses,
        }
    }
}

/// Parse one line of a sample stream
///
/// **Public** - used by the replay source and tests
///
/// # Arguments
/// * `line` - Raw line, without the trailing newline
/// * `line_number` - 1-based position, only used in error messages
///
/// # Returns
/// `None` for blank and comment lines, the parsed sample otherwise
///
/// # Errors
/// * `SampleError::InvalidLine` - Line has trailing garbage after the stack
/// * `SampleError::InvalidProcessId` - First field is not an `i32`
/// * `SampleError::InvalidAddress` - A frame is not a hex `u64`
pub fn parse_sample_line(line: &str, line_number: usize) -> Result<Option<Sample>, SampleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();

    let pid_field = fields.next().unwrap_or_default();
    let process_id = pid_field
        .parse::<i32>()
        .map_err(|_| SampleError::InvalidProcessId(pid_field.to_string()))?;

    let addresses = match fields.next() {
        Some(stack) => parse_stack(stack)?,
        None => Vec::new(),
    };

    if let Some(extra) = fields.next() {
        return Err(SampleError::InvalidLine {
            line: line_number,
            reason: format!("unexpected field '{}'", extra),
        });
    }

    Ok(Some(Sample::new(process_id, addresses)))
}

/// Parse a `;`-separated list of hex addresses
fn parse_stack(stack: &str) -> Result<Vec<u64>, SampleError> {
    stack
        .split(';')
        .filter(|frame| !frame.is_empty())
        .map(parse_address)
        .collect()
}

/// Parse one hex address, with or without `0x`
///
/// **Public** - shared with the symbol map loader
pub fn parse_address(text: &str) -> Result<u64, SampleError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    u64::from_str_radix(digits, 16).map_err(|_| SampleError::InvalidAddress(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let sample = parse_sample_line("4242 0x7f10a0;0x7f10b4;401000", 1)
            .unwrap()
            .unwrap();

        assert_eq!(sample.process_id, 4242);
        assert_eq!(sample.addresses, vec![0x7f10a0, 0x7f10b4, 0x401000]);
    }

    #[test]
    fn test_parse_pid_only_is_empty_stack() {
        let sample = parse_sample_line("5", 1).unwrap().unwrap();
        assert_eq!(sample, Sample::new(5, vec![]));
    }

    #[test]
    fn test_skip_blank_and_comments() {
        assert!(parse_sample_line("", 1).unwrap().is_none());
        assert!(parse_sample_line("   ", 2).unwrap().is_none());
        assert!(parse_sample_line("# recorded on host-a", 3).unwrap().is_none());
    }

    #[test]
    fn test_invalid_pid() {
        let err = parse_sample_line("abc 0x1", 1).unwrap_err();
        assert!(matches!(err, SampleError::InvalidProcessId(_)));
    }

    #[test]
    fn test_invalid_address() {
        let err = parse_sample_line("1 0x1;0xZZ", 1).unwrap_err();
        assert!(matches!(err, SampleError::InvalidAddress(_)));
    }

    #[test]
    fn test_trailing_field_rejected() {
        let err = parse_sample_line("1 0x1 extra", 7).unwrap_err();
        match err {
            SampleError::InvalidLine { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_address_prefixes() {
        assert_eq!(parse_address("0xff").unwrap(), 255);
        assert_eq!(parse_address("0XFF").unwrap(), 255);
        assert_eq!(parse_address("ff").unwrap(), 255);
        assert!(parse_address("").is_err());
    }
}
