//! Credentials for Google-hosted models

pub mod adc;

pub use adc::AdcTokenSource;
