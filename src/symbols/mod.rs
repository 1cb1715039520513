//! Symbol resolution for reported stacks.

pub mod resolver;

pub use resolver::{format_address, HexResolver, SymbolMap, SymbolResolver};
