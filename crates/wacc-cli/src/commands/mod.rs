pub mod structure;
pub mod wacc;
