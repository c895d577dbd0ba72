//! Technical indicators computed over historical close series.

pub mod rsi;

pub use rsi::rsi;
