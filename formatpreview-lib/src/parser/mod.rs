pub mod selector;
pub mod structure;
