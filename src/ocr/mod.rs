pub mod fields;
pub mod recognizer;
pub mod relay;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_support;
