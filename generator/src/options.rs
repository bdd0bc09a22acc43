use std::collections::BTreeMap;

use log::debug;

use crate::error::{GenError, Result};

/// Generator switches, parsed from the `cr:key[=value]` option map handed
/// over by the compiler driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Place each program's files under its namespace path.
    pub namespaced: bool,
    /// Emit `<service>_server.skeleton.cr` next to the generated code.
    pub skeleton:   bool,
}

impl Default for GeneratorOptions {
    fn default() -> GeneratorOptions {
        GeneratorOptions {
            namespaced: false,
            skeleton:   true,
        }
    }
}

impl GeneratorOptions {
    /// Values are ignored; only the presence of a key matters.
    pub fn from_map(options: &BTreeMap<String, String>) -> Result<GeneratorOptions> {
        let mut parsed = GeneratorOptions::default();
        for key in options.keys() {
            match key.as_str() {
                "namespaced" => parsed.namespaced = true,
                "no-skeleton" | "no_skeleton" => parsed.skeleton = false,
                other => return Err(GenError::UnknownOption(other.to_string())),
            }
        }
        debug!("generator options {:?}", parsed);
        Ok(parsed)
    }
}
