//! Upstream filtering applied before samples reach the table.

use super::sample::Sample;
use crate::symbols::SymbolResolver;
use crate::utils::config::KERNEL_ADDRESS_START;
use std::collections::HashMap;
use std::sync::Arc;

/// Which processes to keep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProcessFilter {
    #[default]
    All,
    Pid(i32),
    Name(String),
}

/// Drops unwanted processes and kernel frames from incoming samples
///
/// **Public** - sits between a `SampleSource` and the aggregation table
///
/// Name filters look the process name up once per pid and remember the
/// decision for the lifetime of the filter.
pub struct SampleFilter {
    process: ProcessFilter,
    include_kernel: bool,
    resolver: Arc<dyn SymbolResolver>,
    decisions: HashMap<i32, bool>,
}

impl SampleFilter {
    pub fn new(
        process: ProcessFilter,
        include_kernel: bool,
        resolver: Arc<dyn SymbolResolver>,
    ) -> Self {
        Self {
            process,
            include_kernel,
            resolver,
            decisions: HashMap::new(),
        }
    }

    /// Filter one sample
    ///
    /// # Returns
    /// `None` when the process is filtered out, or when the stack only held
    /// kernel frames and kernel frames are excluded
    pub fn apply(&mut self, mut sample: Sample) -> Option<Sample> {
        if !self.keeps_process(sample.process_id) {
            return None;
        }

        if !self.include_kernel && !sample.addresses.is_empty() {
            sample.addresses.retain(|&address| !is_kernel_address(address));
            if sample.addresses.is_empty() {
                return None;
            }
        }

        Some(sample)
    }

    fn keeps_process(&mut self, process_id: i32) -> bool {
        match &self.process {
            ProcessFilter::All => true,
            ProcessFilter::Pid(pid) => *pid == process_id,
            ProcessFilter::Name(name) => {
                let resolver = &self.resolver;
                *self.decisions.entry(process_id).or_insert_with(|| {
                    resolver.process_name(process_id).as_deref() == Some(name.as_str())
                })
            }
        }
    }
}

/// True for addresses in the kernel half of the address space
pub fn is_kernel_address(address: u64) -> bool {
    address >= KERNEL_ADDRESS_START
}
