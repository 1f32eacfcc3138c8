use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use regex::Regex;

/// Named patterns applied to recognized text, one output field per pattern.
#[derive(Debug, Default)]
pub struct FieldExtractor {
    patterns: Vec<(String, Regex)>,
}

impl FieldExtractor {
    /// Parse `NAME=REGEX` pairs as they appear on the command line or in the
    /// configuration file.
    pub fn parse(specs: &[String]) -> Result<Self> {
        let mut patterns: Vec<(String, Regex)> = Vec::with_capacity(specs.len());
        for spec in specs {
            let (name, pattern) = match spec.split_once('=') {
                Some(parts) => parts,
                None => bail!("pattern {spec:?} is not of the form NAME=REGEX"),
            };
            if name.is_empty() {
                bail!("pattern {spec:?} has an empty name");
            }
            if patterns.iter().any(|(existing, _)| existing == name) {
                bail!("pattern name {name:?} is used twice");
            }
            let regex = Regex::new(pattern)
                .with_context(|| format!("pattern {name:?} does not compile"))?;
            patterns.push((name.to_string(), regex));
        }
        Ok(Self { patterns })
    }

    /// First match per pattern, or `None` when a pattern finds nothing.
    /// Newlines inside a match collapse to `-` so field values stay on one
    /// line.
    pub fn extract(&self, text: &str) -> BTreeMap<String, Option<String>> {
        self.patterns
            .iter()
            .map(|(name, regex)| {
                let value = regex.find(text).map(|m| m.as_str().replace('\n', "-"));
                (name.clone(), value)
            })
            .collect()
    }
}
