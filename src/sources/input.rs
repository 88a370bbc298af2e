use std::fs;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::error::Result;

/// Read a whole JSON document from `path`, or from stdin when `path` is `None` or `-`.
pub fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            debug!("Reading input from {}", path.display());
            Ok(fs::read(path)?)
        }
        _ => {
            debug!("Reading input from stdin");
            let mut raw = Vec::new();
            std::io::stdin().lock().read_to_end(&mut raw)?;
            Ok(raw)
        }
    }
}
