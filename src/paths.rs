//! Output directory layout
//!
//! Every execution context maps to one of two directory trees: element
//! canvas tests under `element/`, offscreen and worker tests under
//! `offscreen/`. Test names are routed into sub-directories through a
//! longest-prefix catalog supplied on the command line.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DefinitionError;

/// The element/offscreen directory (or file-stem) pair for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub element: PathBuf,
    pub offscreen: PathBuf,
}

impl OutputPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            element: root.join("element"),
            offscreen: root.join("offscreen"),
        }
    }

    /// A new pair with `sub` joined onto both sides. Used both for
    /// sub-directories and for file stems.
    pub fn sub_path(&self, sub: &str) -> OutputPaths {
        OutputPaths {
            element: self.element.join(sub),
            offscreen: self.offscreen.join(sub),
        }
    }

    /// Create both directories, parents included.
    pub fn mkdir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.element)?;
        std::fs::create_dir_all(&self.offscreen)
    }
}

/// Name-prefix → sub-directory catalog.
pub type Catalog = BTreeMap<String, String>;

/// Resolve the target sub-directory for a test name: the longest catalog
/// prefix that the name starts with wins.
pub fn test_sub_dir<'a>(name: &str, catalog: &'a Catalog) -> Result<&'a str, DefinitionError> {
    let mut prefixes: Vec<&String> = catalog.keys().collect();
    prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
    for prefix in prefixes {
        if name.starts_with(prefix.as_str()) {
            return Ok(&catalog[prefix]);
        }
    }
    Err(DefinitionError::NoSubDirMapping {
        name: name.to_string(),
    })
}
