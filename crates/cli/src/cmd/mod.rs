//! CLI command implementations

pub mod checkout;
pub mod run;
pub mod show;
