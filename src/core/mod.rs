pub mod config;
pub mod errors;
pub mod llm;
pub mod marketplace;
pub mod packager;
pub mod pipeline;
pub mod seen;
pub mod status;
pub mod terminal;

#[cfg(test)]
pub(crate) mod test_support;
