//! Shared utilities: variable-length integers and sortable numeric terms.

pub mod numeric;
pub mod varint;
