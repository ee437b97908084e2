//! Zone file loading.
//!
//! A zone file holds one `name,target,kind` record per line. Lines with a
//! different field count or an unknown kind are skipped.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::Record;

/// Parse zone file contents. Zone records never expire.
pub fn parse(text: &str) -> Vec<Record> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            if line.trim().is_empty() {
                return None;
            }
            let record = Record::parse_line(line, None);
            if record.is_none() {
                debug!(line = index + 1, content = line, "skipping zone line");
            }
            record
        })
        .collect()
}

/// Read and parse a zone file.
pub fn load(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Zone {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse(&text))
}
