//! Dimension expansion
//!
//! A test description declares its variant space as a list of dimensions,
//! each a mapping from option name to parameter overlay, plus a parallel
//! `variants_layout` list saying whether a dimension fans out into
//! separate files or multiplies the variants inside one grid. Expansion
//! applies the dimensions in declaration order and yields finalized
//! grids.

use crate::error::DefinitionError;
use crate::grid::{DimensionOption, VariantGrid};
use crate::params::{self, ParamMap};
use crate::template::TemplateEngine;
use crate::variant::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantLayout {
    /// Every option of the dimension lands in its own output file.
    MultiFiles,
    /// All options of the dimension share one output file, side by side.
    SingleFile,
}

impl VariantLayout {
    fn parse(s: &str) -> Option<VariantLayout> {
        match s {
            "multi_files" => Some(VariantLayout::MultiFiles),
            "single_file" => Some(VariantLayout::SingleFile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariantDimension {
    pub options: Vec<DimensionOption>,
    pub layout: VariantLayout,
}

fn parse_options(dimension: &serde_yaml::Value) -> Result<Vec<DimensionOption>, DefinitionError> {
    let serde_yaml::Value::Mapping(mapping) = dimension else {
        return Err(DefinitionError::VariantsNotAList);
    };
    let mut options = Vec::with_capacity(mapping.len());
    for (name, overlay) in mapping {
        let name = name.as_str().ok_or(DefinitionError::VariantsNotAList)?;
        let overlay = match overlay {
            serde_yaml::Value::Null => ParamMap::new(),
            serde_yaml::Value::Mapping(map) => map.clone(),
            _ => return Err(DefinitionError::VariantsNotAList),
        };
        options.push((name.to_string(), overlay));
    }
    Ok(options)
}

/// Parse the `variants` / `variants_layout` declarations of a test.
pub fn variant_dimensions(test: &ParamMap) -> Result<Vec<VariantDimension>, DefinitionError> {
    let variants = match params::get(test, "variants") {
        None => return Ok(Vec::new()),
        Some(serde_yaml::Value::Sequence(seq)) => seq,
        Some(_) => return Err(DefinitionError::VariantsNotAList),
    };

    let layouts = match params::get(test, "variants_layout") {
        None => vec![VariantLayout::MultiFiles; variants.len()],
        Some(serde_yaml::Value::Sequence(seq)) => {
            if seq.len() != variants.len() {
                return Err(DefinitionError::LayoutCountMismatch);
            }
            let mut layouts = Vec::with_capacity(seq.len());
            let mut invalid = Vec::new();
            for value in seq {
                let token = value.as_str().unwrap_or("");
                match VariantLayout::parse(token) {
                    Some(layout) => layouts.push(layout),
                    // The bare token reads better in the error than its
                    // quoted YAML form.
                    None => invalid.push(match value.as_str() {
                        Some(s) => s.to_string(),
                        None => params::display_value(value),
                    }),
                }
            }
            if !invalid.is_empty() {
                return Err(DefinitionError::InvalidLayout(invalid.join(", ")));
            }
            layouts
        }
        Some(other) => return Err(DefinitionError::InvalidLayout(params::display_value(other))),
    };

    variants
        .iter()
        .zip(layouts)
        .map(|(dimension, layout)| {
            Ok(VariantDimension {
                options: parse_options(dimension)?,
                layout,
            })
        })
        .collect()
}

/// Expand a test description into its finalized variant grids.
pub fn variant_grids(
    test: &ParamMap,
    engine: &TemplateEngine,
) -> Result<Vec<VariantGrid>, DefinitionError> {
    let grid_width = match params::get(test, "grid_width") {
        None => 1,
        Some(value) => value
            .as_u64()
            .map(|w| w as usize)
            .ok_or(DefinitionError::InvalidGridWidth)?,
    };

    let base = Variant::create_with_defaults(test);
    let mut grids = vec![VariantGrid::new(vec![base], grid_width)];
    for dimension in variant_dimensions(test)? {
        match dimension.layout {
            VariantLayout::MultiFiles => {
                let mut fanned = Vec::with_capacity(grids.len() * dimension.options.len());
                for (name, overlay) in &dimension.options {
                    for grid in &grids {
                        fanned.push(grid.merge_params(name, overlay));
                    }
                }
                grids = fanned;
            }
            VariantLayout::SingleFile => {
                grids = grids
                    .iter()
                    .map(|grid| grid.add_dimension(&dimension.options))
                    .collect();
            }
        }
    }

    for grid in &mut grids {
        grid.finalize(engine)?;
    }
    Ok(grids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_from_yaml(yaml: &str) -> ParamMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_no_variants_yields_one_grid() {
        let test = test_from_yaml("name: t\ncode: x;");
        let grids = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].variants().len(), 1);
        assert_eq!(grids[0].file_name(), "t");
    }

    #[test]
    fn test_fan_out_produces_one_grid_per_combination() {
        let test = test_from_yaml(
            "name: t\ncode: x;\nvariants:\n- a:\n  b:\n- one:\n  two:\n  three:\n",
        );
        let grids = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap();
        let names: Vec<&str> = grids.iter().map(|g| g.file_name()).collect();
        // Later dimensions vary slowest across files.
        assert_eq!(
            names,
            ["t.a.one", "t.b.one", "t.a.two", "t.b.two", "t.a.three", "t.b.three"]
        );
        assert!(grids.iter().all(|g| g.variants().len() == 1));
    }

    #[test]
    fn test_single_file_dimension_builds_a_grid() {
        let test = test_from_yaml(
            "name: t\ncode: x;\nvariants:\n- a:\n  b:\n  c:\nvariants_layout:\n- single_file\n",
        );
        let grids = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].variants().len(), 3);
        assert_eq!(grids[0].grid_width(), 3);
        assert_eq!(grids[0].file_name(), "t");
    }

    #[test]
    fn test_mixed_layouts() {
        let test = test_from_yaml(
            "name: t\ncode: x;\nvariants:\n- a:\n  b:\n- one:\n  two:\n\
             variants_layout:\n- multi_files\n- single_file\n",
        );
        let grids = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap();
        assert_eq!(grids.len(), 2);
        assert_eq!(grids[0].file_name(), "t.a");
        assert_eq!(grids[1].file_name(), "t.b");
        assert!(grids.iter().all(|g| g.variants().len() == 2));
    }

    #[test]
    fn test_variant_overlay_parameters_apply() {
        let test = test_from_yaml(
            "name: t\ncode: x;\nvariants:\n- red:\n    color: '#f00'\n  blue:\n    color: '#00f'\n",
        );
        let grids = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap();
        assert_eq!(
            params::get_str(grids[0].variants()[0].params(), "color"),
            Some("#f00")
        );
        assert_eq!(
            params::get_str(grids[1].variants()[0].params(), "color"),
            Some("#00f")
        );
    }

    #[test]
    fn test_variants_must_be_a_list() {
        let test = test_from_yaml("name: t\nvariants:\n  a:\n  b:\n");
        let err = variant_dimensions(&test).unwrap_err();
        assert!(matches!(err, DefinitionError::VariantsNotAList));
    }

    #[test]
    fn test_layout_length_mismatch() {
        let test = test_from_yaml(
            "name: t\nvariants:\n- a:\n- b:\nvariants_layout:\n- single_file\n",
        );
        let err = variant_dimensions(&test).unwrap_err();
        assert!(matches!(err, DefinitionError::LayoutCountMismatch));
    }

    #[test]
    fn test_unknown_layout_token() {
        let test = test_from_yaml(
            "name: t\nvariants:\n- a:\nvariants_layout:\n- one_big_file\n",
        );
        let err = variant_dimensions(&test).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidLayout(tokens) if tokens == "one_big_file"));
    }

    #[test]
    fn test_invalid_layout_lists_every_bad_token() {
        let test = test_from_yaml(
            "name: t\nvariants:\n- a:\n- b:\nvariants_layout:\n- one_big_file\n- 7\n",
        );
        let err = variant_dimensions(&test).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidLayout(tokens) if tokens == "one_big_file, 7"));
    }

    #[test]
    fn test_grid_width_must_be_an_integer() {
        let test = test_from_yaml("name: t\ncode: x;\ngrid_width: wide\n");
        let err = variant_grids(&test, &TemplateEngine::with_builtins()).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidGridWidth));
    }
}
