//! Generation driver
//!
//! Loads the name-to-directory catalog and the YAML test definitions,
//! expands each description into its variant grids and writes every
//! output file. Any invalid definition aborts the whole run; the
//! generated corpus is only useful when complete.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{DefinitionError, GenError};
use crate::expand;
use crate::ledger::UniquenessLedger;
use crate::params::{self, contains, ParamMap};
use crate::paths::{self, Catalog, OutputPaths};
use crate::raster::Rasterizer;
use crate::template::TemplateEngine;

/// Load the name-prefix to sub-directory catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog, GenError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
    let serde_yaml::Value::Mapping(mapping) = value else {
        return Err(DefinitionError::CatalogFormat.into());
    };
    let mut catalog = Catalog::new();
    for (prefix, sub_dir) in &mapping {
        let (Some(prefix), Some(sub_dir)) = (prefix.as_str(), sub_dir.as_str()) else {
            return Err(DefinitionError::CatalogFormat.into());
        };
        catalog.insert(prefix.to_string(), sub_dir.to_string());
    }
    Ok(catalog)
}

/// Expand a `bulk` description into one description per instance: the
/// deep-copied base with the instance overlay merged on top.
fn expand_bulk(test: &ParamMap) -> Result<Vec<ParamMap>, DefinitionError> {
    let Some(serde_yaml::Value::Mapping(bulk)) = params::get(test, "bulk") else {
        return Err(DefinitionError::BulkFormat);
    };
    let Some(serde_yaml::Value::Mapping(base)) = params::get(bulk, "base") else {
        return Err(DefinitionError::BulkFormat);
    };
    let Some(serde_yaml::Value::Sequence(instances)) = params::get(bulk, "instances") else {
        return Err(DefinitionError::BulkFormat);
    };
    instances
        .iter()
        .map(|instance| match instance {
            serde_yaml::Value::Mapping(overlay) => Ok(params::merged(base, overlay)),
            _ => Err(DefinitionError::BulkFormat),
        })
        .collect()
}

/// Load every `*.yaml` definition file under `defs_dir`, in file name
/// order, skipping `DISABLED` descriptions and expanding `bulk` entries.
pub fn load_definitions(defs_dir: &Path) -> Result<Vec<ParamMap>, GenError> {
    let pattern = defs_dir.join("*.yaml");
    let mut files: Vec<_> = glob::glob(&pattern.to_string_lossy())?
        .collect::<Result<_, _>>()
        .map_err(std::io::Error::from)?;
    files.sort();

    let mut tests = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(&file)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
        let format_error = || DefinitionError::DefinitionFormat {
            path: file.display().to_string(),
        };
        let serde_yaml::Value::Sequence(descriptions) = value else {
            return Err(format_error().into());
        };
        for description in descriptions {
            let serde_yaml::Value::Mapping(test) = description else {
                return Err(format_error().into());
            };
            if contains(&test, "DISABLED") {
                continue;
            }
            if contains(&test, "bulk") {
                tests.extend(expand_bulk(&test)?);
            } else {
                tests.push(test);
            }
        }
    }
    Ok(tests)
}

/// Generate all test files from the definitions under `defs_dir` into the
/// element/offscreen trees under `out_root`.
pub fn generate_test_files(
    catalog_path: &Path,
    defs_dir: &Path,
    out_root: &Path,
    rasterizer: &dyn Rasterizer,
) -> Result<(), GenError> {
    let engine = TemplateEngine::with_builtins();
    let catalog = load_catalog(catalog_path)?;
    let tests = load_definitions(defs_dir)?;

    let output_dirs = OutputPaths::new(out_root);
    let sub_dirs: BTreeSet<&String> = catalog.values().collect();
    for sub_dir in sub_dirs {
        output_dirs.sub_path(sub_dir).mkdir()?;
    }

    let mut used_filenames = UniquenessLedger::new();
    let mut used_variants = UniquenessLedger::new();
    for test in &tests {
        let name = params::get_str(test, "name").unwrap_or("");
        println!("{name}");
        for mut grid in expand::variant_grids(test, &engine)? {
            if grid.file_name() != name {
                println!("  {}", grid.file_name());
            }

            used_filenames.claim(grid.file_name(), grid.canvas_types())?;
            for variant in grid.variants() {
                let mut identity = vec![grid.file_name().to_string()];
                identity.extend(variant.grid_variant_names());
                used_variants.claim(&identity.join("."), grid.canvas_types())?;
            }

            let sub_dir = paths::test_sub_dir(grid.file_name(), &catalog)?;
            grid.generate(&engine, rasterizer, &output_dirs.sub_path(sub_dir))?;
        }
    }
    println!();
    Ok(())
}
