//! Configuration and constants for the CLI.

use std::time::Duration;

/// Current JSON dump schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Stacks printed per ranked report
pub const DEFAULT_TOP_STACKS: usize = 10;

/// Upper bound accepted for `--top`
pub const MAX_TOP_STACKS: usize = 10_000;

/// Producer threads draining the sample queue
pub const DEFAULT_PRODUCER_THREADS: usize = 4;

/// Capacity of the bounded sample queue between source and producers
pub const SAMPLE_QUEUE_CAPACITY: usize = 8_192;

/// First address of the kernel half on x86-64 and aarch64 (48-bit VA)
pub const KERNEL_ADDRESS_START: u64 = 0xffff_8000_0000_0000;

/// Longest interval accepted for `--interval`
pub const MAX_REPORT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Process name printed when the resolver cannot find one
pub const UNKNOWN_PROCESS_NAME: &str = "?";

/// ANSI sequence that clears the terminal and homes the cursor
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
