//! Test suites for the bootstrap core.

mod support;
mod unit;
