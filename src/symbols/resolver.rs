//! Address and process name resolution for reports.
//!
//! The aggregation core only ever sees raw addresses. Reports call a
//! [`SymbolResolver`] on the stacks they are about to print.

use crate::capture::sample::parse_address;
use crate::utils::error::SymbolError;
use log::{debug, info};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Turns `(pid, address)` pairs into printable frames
///
/// **Public** - implemented by every symbol backend
pub trait SymbolResolver: Send + Sync {
    /// Printable name for one frame
    fn resolve_frame(&self, process_id: i32, address: u64) -> String;

    /// Name of the process, `None` when it cannot be found
    fn process_name(&self, process_id: i32) -> Option<String>;

    /// Resolve a whole stack, keeping frame order
    fn resolve(&self, process_id: i32, addresses: &[u64]) -> Vec<String> {
        addresses
            .iter()
            .map(|&address| self.resolve_frame(process_id, address))
            .collect()
    }
}

/// Prints frames as hex addresses
///
/// Process names come from `/proc/<pid>/comm` where that exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct HexResolver;

impl SymbolResolver for HexResolver {
    fn resolve_frame(&self, _process_id: i32, address: u64) -> String {
        format_address(address)
    }

    fn process_name(&self, process_id: i32) -> Option<String> {
        system_process_name(process_id)
    }
}

/// On-disk layout of a symbol map
///
/// ```json
/// {
///   "process_names": { "4242": "nginx" },
///   "symbols": { "0x401000": "main", "0x401200": "handle_request" }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
struct SymbolMapFile {
    #[serde(default)]
    process_names: HashMap<i32, String>,

    #[serde(default)]
    symbols: HashMap<String, String>,
}

/// Resolves frames against a start-address symbol table
///
/// An address maps to the closest symbol starting at or below it, printed as
/// `name` or `name+0xoffset`. Addresses below every symbol fall back to hex.
#[derive(Debug, Default, Clone)]
pub struct SymbolMap {
    process_names: HashMap<i32, String>,
    symbols: BTreeMap<u64, String>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol starting at `address`
    pub fn insert_symbol(&mut self, address: u64, name: impl Into<String>) {
        self.symbols.insert(address, name.into());
    }

    /// Register a process name
    pub fn insert_process(&mut self, process_id: i32, name: impl Into<String>) {
        self.process_names.insert(process_id, name.into());
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Load a symbol map from a JSON file
    ///
    /// **Public** - used by the report command for `--symbols`
    ///
    /// # Errors
    /// * `SymbolError::ReadFailed` - File cannot be opened
    /// * `SymbolError::JsonError` - File is not a valid symbol map
    /// * `SymbolError::InvalidAddress` - A symbol key is not a hex address
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SymbolError> {
        let path = path.as_ref();
        debug!("Loading symbol map from: {}", path.display());

        let file = File::open(path)?;
        let raw: SymbolMapFile = serde_json::from_reader(BufReader::new(file))?;
        let map = Self::from_file(raw)?;

        info!(
            "Loaded {} symbols and {} process names",
            map.symbols.len(),
            map.process_names.len()
        );
        Ok(map)
    }

    /// Parse a symbol map from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SymbolError> {
        let raw: SymbolMapFile = serde_json::from_str(json)?;
        Self::from_file(raw)
    }

    fn from_file(raw: SymbolMapFile) -> Result<Self, SymbolError> {
        let symbols = raw
            .symbols
            .into_iter()
            .map(|(address, name)| {
                parse_address(&address)
                    .map(|address| (address, name))
                    .map_err(|_| SymbolError::InvalidAddress(address))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            process_names: raw.process_names,
            symbols,
        })
    }
}

impl SymbolResolver for SymbolMap {
    fn resolve_frame(&self, _process_id: i32, address: u64) -> String {
        match self.symbols.range(..=address).next_back() {
            Some((&start, name)) if start == address => name.clone(),
            Some((&start, name)) => format!("{}+0x{:x}", name, address - start),
            None => format_address(address),
        }
    }

    fn process_name(&self, process_id: i32) -> Option<String> {
        self.process_names
            .get(&process_id)
            .cloned()
            .or_else(|| system_process_name(process_id))
    }
}

/// Format an address the way reports print unresolved frames
pub fn format_address(address: u64) -> String {
    format!("0x{:x}", address)
}

/// Look a process name up in procfs
fn system_process_name(process_id: i32) -> Option<String> {
    if process_id < 0 {
        return None;
    }

    std::fs::read_to_string(format!("/proc/{}/comm", process_id))
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_resolver_formats_addresses() {
        let resolver = HexResolver;
        assert_eq!(resolver.resolve_frame(1, 0x401000), "0x401000");
        assert_eq!(resolver.resolve(1, &[0xa, 0xb]), vec!["0xa", "0xb"]);
    }

    #[test]
    fn test_symbol_map_exact_and_offset() {
        let mut map = SymbolMap::new();
        map.insert_symbol(0x1000, "main");
        map.insert_symbol(0x2000, "worker");

        assert_eq!(map.resolve_frame(1, 0x1000), "main");
        assert_eq!(map.resolve_frame(1, 0x1010), "main+0x10");
        assert_eq!(map.resolve_frame(1, 0x2004), "worker+0x4");
        assert_eq!(map.resolve_frame(1, 0x10), "0x10");
    }

    #[test]
    fn test_symbol_map_from_json() {
        let map = SymbolMap::from_json(
            r#"{"process_names": {"100": "nginx"}, "symbols": {"0xa": "leaf", "b0": "root"}}"#,
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve_frame(100, 0xa), "leaf");
        assert_eq!(map.resolve_frame(100, 0xb0), "root");
        assert_eq!(map.process_name(100), Some("nginx".to_string()));
    }

    #[test]
    fn test_symbol_map_rejects_bad_address() {
        let err = SymbolMap::from_json(r#"{"symbols": {"main": "main"}}"#).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidAddress(_)));
    }

    #[test]
    fn test_negative_pid_has_no_system_name() {
        assert_eq!(HexResolver.process_name(-1), None);
    }
}
