//! CLI library components for the payment-times reporting pipeline.

pub mod logging;
