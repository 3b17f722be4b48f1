//! Command implementations.

pub mod config;
pub mod ingest;
pub mod process;
pub mod run;

use std::io::Read;
use std::path::Path;

/// Read a file, or stdin when the path is `-`.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))
    }
}
