//! Unit tests for patch_compiler

mod test_properties;
mod test_scenarios;
mod test_workspace;
