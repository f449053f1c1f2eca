//! Variant grids
//!
//! A [`VariantGrid`] owns the variants that share one output file per
//! execution context. Fan-out dimensions split into new grids (one per
//! option); grid dimensions multiply the variants inside a grid, to be
//! rendered side by side in a CSS grid. A grid with one variant produces
//! the classic one-test-per-file output.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::{DefinitionError, GenError};
use crate::params::{self, display_value, get_str, set, ParamMap};
use crate::paths::OutputPaths;
use crate::raster::{composite_grid, save_png, Rasterizer};
use crate::template::TemplateEngine;
use crate::variant::{CanvasType, TemplateType, Variant};

/// One named option of a variant dimension: the label appended to the
/// variant name plus the parameter overlay it carries.
pub type DimensionOption = (String, ParamMap);

#[derive(Debug, Clone)]
pub struct VariantGrid {
    variants: Vec<Variant>,
    grid_width: usize,
    // Derived by finalize.
    file_name: String,
    canvas_types: BTreeSet<CanvasType>,
    template_type: Option<TemplateType>,
    /// Parameters rendered for each enabled canvas type. For a
    /// single-variant grid these are the variant's own; otherwise they
    /// are the grid-level parameters wrapping the member variants.
    context_params: BTreeMap<CanvasType, ParamMap>,
}

impl VariantGrid {
    pub fn new(variants: Vec<Variant>, grid_width: usize) -> VariantGrid {
        VariantGrid {
            variants,
            grid_width,
            file_name: String::new(),
            canvas_types: BTreeSet::new(),
            template_type: None,
            context_params: BTreeMap::new(),
        }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    /// File name (stem) this grid will be written to. Valid after
    /// finalization.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Union of the canvas types enabled on this grid's variants.
    pub fn canvas_types(&self) -> &BTreeSet<CanvasType> {
        &self.canvas_types
    }

    pub fn template_type(&self) -> TemplateType {
        self.template_type.expect("grid not finalized")
    }

    pub fn context_params(&self) -> &BTreeMap<CanvasType, ParamMap> {
        &self.context_params
    }

    /// Merge a parameter overlay into every variant of this grid. Fan-out
    /// step: the option name becomes part of each variant's file name.
    pub fn merge_params(&self, name: &str, overlay: &ParamMap) -> VariantGrid {
        let variants = self
            .variants
            .iter()
            .map(|variant| variant.merge_params(overlay).with_file_variant_name(name))
            .collect();
        VariantGrid::new(variants, self.grid_width)
    }

    /// Multiply this grid by a dimension. A grid of N variants crossed
    /// with M options yields N*M variants; the new option varies slowest,
    /// so the first dimension added runs along grid rows. The first
    /// dimension also dictates the grid width unless `grid_width` was
    /// given explicitly.
    pub fn add_dimension(&self, options: &[DimensionOption]) -> VariantGrid {
        let mut variants = Vec::with_capacity(self.variants.len() * options.len());
        for (name, overlay) in options {
            for variant in &self.variants {
                variants.push(variant.merge_params(overlay).with_grid_variant_name(name));
            }
        }
        let grid_width = if self.grid_width > 1 {
            self.grid_width
        } else {
            options.len()
        };
        VariantGrid::new(variants, grid_width)
    }

    /// The value every variant of this grid agrees on for `field`, over
    /// the given canvas types. Divergence is an authoring mistake.
    fn unique_param(
        &self,
        types: &[CanvasType],
        field: &str,
    ) -> Result<Option<Value>, DefinitionError> {
        let mut values: Vec<Option<&Value>> = Vec::new();
        for variant in &self.variants {
            for (canvas_type, ctx) in variant.context_params() {
                if types.contains(canvas_type) {
                    let value = params::get(ctx, field);
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            }
        }
        if values.len() != 1 {
            return Err(DefinitionError::InconsistentField {
                field: field.to_string(),
                values: values
                    .iter()
                    .map(|v| v.map(display_value).unwrap_or_else(|| "null".to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(values.remove(0).cloned())
    }

    /// Union of the sequence-valued `field` across all variants for the
    /// given canvas types, deduplicated in first-seen order.
    fn param_set(&self, types: &[CanvasType], field: &str) -> Vec<Value> {
        let mut union = Vec::new();
        for variant in &self.variants {
            for (canvas_type, ctx) in variant.context_params() {
                if !types.contains(canvas_type) {
                    continue;
                }
                if let Some(Value::Sequence(seq)) = params::get(ctx, field) {
                    for value in seq {
                        if !union.contains(value) {
                            union.push(value.clone());
                        }
                    }
                }
            }
        }
        union
    }

    fn unique_template_type(&self) -> Result<TemplateType, DefinitionError> {
        let mut distinct: Vec<TemplateType> = Vec::new();
        for variant in &self.variants {
            let template_type = variant.template_type();
            if !distinct.contains(&template_type) {
                distinct.push(template_type);
            }
        }
        if distinct.len() != 1 {
            return Err(DefinitionError::InconsistentField {
                field: "template_type".to_string(),
                values: distinct
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(distinct[0])
    }

    /// Grid-level parameters wrapping the member variants, one mapping
    /// per enabled canvas type.
    fn grid_params(&self) -> Result<BTreeMap<CanvasType, ParamMap>, DefinitionError> {
        let mut all = BTreeMap::new();
        for canvas_type in &self.canvas_types {
            let one = [*canvas_type];
            let members: Vec<Value> = self
                .variants
                .iter()
                .filter_map(|v| v.context_params().get(canvas_type))
                .map(|ctx| Value::Mapping(ctx.clone()))
                .collect();

            let mut grid = ParamMap::new();
            set(&mut grid, "variants", Value::Sequence(members));
            set(&mut grid, "grid_width", Value::from(self.grid_width as u64));
            for field in ["name", "test_type", "fuzzy", "timeout", "notes"] {
                if let Some(value) = self.unique_param(&one, field)? {
                    set(&mut grid, field, value);
                }
            }
            for field in ["images", "svgimages", "fonts"] {
                set(&mut grid, field, Value::Sequence(self.param_set(&one, field)));
            }
            if self.template_type().is_reference() {
                if let Some(desc) = self.unique_param(&one, "desc")? {
                    set(&mut grid, "desc", desc);
                }
            }
            all.insert(*canvas_type, grid);
        }
        Ok(all)
    }

    /// Finalize the member variants (assigning cell ids in grid order)
    /// and compute the grid-level derived fields.
    pub fn finalize(&mut self, engine: &TemplateEngine) -> Result<(), DefinitionError> {
        for (id, variant) in self.variants.iter_mut().enumerate() {
            variant.finalize(engine, id)?;
        }

        self.canvas_types = self
            .variants
            .iter()
            .flat_map(|v| v.canvas_types().iter().copied())
            .collect();
        self.template_type = Some(self.unique_template_type()?);
        self.file_name = self
            .unique_param(&CanvasType::ALL, "file_name")?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        self.context_params = if self.variants.len() == 1 {
            self.variants[0].context_params().clone()
        } else {
            self.grid_params()?
        };
        Ok(())
    }

    /// Size all members of this grid agree on for `canvas_type`.
    fn unique_size(&self, canvas_type: CanvasType) -> Result<(u32, u32), DefinitionError> {
        self.unique_param(&[canvas_type], "size")?;
        let member = self
            .variants
            .iter()
            .find(|v| v.canvas_types().contains(&canvas_type));
        Ok(member.map(|v| v.size()).unwrap_or((0, 0)))
    }

    /// Rasterize the per-variant reference images for `canvas_type` and
    /// pack them into one PNG, row-major in grid order.
    fn cairo_reference_grid(
        &mut self,
        canvas_type: CanvasType,
        rasterizer: &dyn Rasterizer,
        output_dirs: &OutputPaths,
    ) -> Result<(), GenError> {
        let any_present = self.variants.iter().any(|v| {
            v.context_params()
                .get(&canvas_type)
                .and_then(|ctx| get_str(ctx, "cairo_reference"))
                .is_some_and(|code| !code.is_empty())
        });
        if !any_present {
            return Ok(());
        }

        let (width, height) = self.unique_size(canvas_type)?;
        let mut cells = Vec::with_capacity(self.variants.len());
        for variant in &self.variants {
            let code = variant
                .context_params()
                .get(&canvas_type)
                .and_then(|ctx| get_str(ctx, "cairo_reference"))
                .filter(|code| !code.is_empty())
                .ok_or(DefinitionError::MissingCairoReference)?;
            cells.push(rasterizer.rasterize(code, width, height)?);
        }
        let surface = composite_grid(&cells, width, height, self.grid_width);

        let img_filename = format!("{}.png", self.file_name);
        let dir = match canvas_type {
            CanvasType::HtmlCanvas => &output_dirs.element,
            CanvasType::OffscreenCanvas | CanvasType::Worker => &output_dirs.offscreen,
        };
        save_png(&surface, &dir.join(&img_filename))?;

        if let Some(ctx) = self.context_params.get_mut(&canvas_type) {
            set(ctx, "img_reference", Value::from(img_filename));
        }
        Ok(())
    }

    /// Produce the raster fixtures this grid needs, validating the
    /// `expected`/`cairo_reference` usage rules first.
    fn generate_raster_images(
        &mut self,
        rasterizer: &dyn Rasterizer,
        output_dirs: &OutputPaths,
    ) -> Result<(), GenError> {
        // Expected images only apply to element-canvas tests.
        let has_expected = self.variants.iter().any(|v| {
            v.context_params()
                .get(&CanvasType::HtmlCanvas)
                .and_then(|ctx| get_str(ctx, "expected"))
                .is_some_and(|e| !e.is_empty())
        });
        let has_cairo_reference = self.variants.iter().any(|v| {
            v.context_params().values().any(|ctx| {
                get_str(ctx, "cairo_reference").is_some_and(|code| !code.is_empty())
            })
        });

        if has_expected && has_cairo_reference {
            return Err(DefinitionError::ExpectedWithCairoReference.into());
        }
        if has_expected {
            if self.variants.len() != 1 {
                return Err(DefinitionError::ExpectedInGrid.into());
            }
            if self.template_type() != TemplateType::Testharness {
                return Err(DefinitionError::ExpectedInReference.into());
            }
            self.variants[0].generate_expected_image(rasterizer, output_dirs)?;
            // The variant's context params gained `expected_img`.
            self.context_params = self.variants[0].context_params().clone();
        } else if has_cairo_reference {
            for canvas_type in self.canvas_types.clone() {
                self.cairo_reference_grid(canvas_type, rasterizer, output_dirs)?;
            }
        }
        Ok(())
    }

    fn write_reference_test(
        &mut self,
        engine: &TemplateEngine,
        output_files: &OutputPaths,
    ) -> Result<(), GenError> {
        let grid = if self.variants.len() > 1 { "_grid" } else { "" };

        // If variants don't all enable the same offscreen and worker
        // canvas types, the offscreen and worker grids won't be identical
        // and the worker test can't reuse the offscreen reference file.
        let offscreen_subsets: BTreeSet<Vec<CanvasType>> = self
            .variants
            .iter()
            .map(|v| {
                v.canvas_types()
                    .iter()
                    .copied()
                    .filter(|t| *t != CanvasType::HtmlCanvas)
                    .collect()
            })
            .collect();
        let needs_worker_reference = offscreen_subsets.len() != 1;

        let ref_template = match self.template_type() {
            TemplateType::Reference => format!("reftest_element{grid}.html"),
            TemplateType::HtmlReference => format!("reftest{grid}.html"),
            TemplateType::CairoReference => format!("reftest_img{grid}.html"),
            TemplateType::Testharness => {
                unreachable!("testharness grids are written by write_testharness_test")
            }
        };

        for canvas_type in self.canvas_types.clone() {
            let (test_template, test_path, ref_name) = match canvas_type {
                CanvasType::HtmlCanvas => (
                    format!("reftest_element{grid}.html"),
                    with_suffix(&output_files.element, ".html"),
                    format!("{}-expected.html", self.file_name),
                ),
                CanvasType::OffscreenCanvas => (
                    format!("reftest_offscreen{grid}.html"),
                    with_suffix(&output_files.offscreen, ".html"),
                    format!("{}-expected.html", self.file_name),
                ),
                CanvasType::Worker => (
                    format!("reftest_worker{grid}.html"),
                    with_suffix(&output_files.offscreen, ".w.html"),
                    if needs_worker_reference {
                        format!("{}.w-expected.html", self.file_name)
                    } else {
                        format!("{}-expected.html", self.file_name)
                    },
                ),
            };
            let ref_path = match canvas_type {
                CanvasType::HtmlCanvas => output_files.element.with_file_name(&ref_name),
                CanvasType::OffscreenCanvas | CanvasType::Worker => {
                    output_files.offscreen.with_file_name(&ref_name)
                }
            };

            let ctx = self
                .context_params
                .get_mut(&canvas_type)
                .expect("context params cover every enabled canvas type");
            set(ctx, "reference_file", Value::from(ref_name.as_str()));
            fs::write(&test_path, engine.render(&test_template, ctx)?)?;

            // The worker test reuses the offscreen reference page unless
            // the grids differ.
            if canvas_type != CanvasType::Worker || needs_worker_reference {
                set(ctx, "is_test_reference", Value::from(true));
                fs::write(&ref_path, engine.render(&ref_template, ctx)?)?;
            }
        }
        Ok(())
    }

    fn write_testharness_test(
        &self,
        engine: &TemplateEngine,
        output_files: &OutputPaths,
    ) -> Result<(), GenError> {
        let grid = if self.variants.len() > 1 { "_grid" } else { "" };

        for (canvas_type, ctx) in &self.context_params {
            let (template, path) = match canvas_type {
                CanvasType::HtmlCanvas => (
                    format!("testharness_element{grid}.html"),
                    with_suffix(&output_files.element, ".html"),
                ),
                CanvasType::OffscreenCanvas => (
                    format!("testharness_offscreen{grid}.html"),
                    with_suffix(&output_files.offscreen, ".html"),
                ),
                CanvasType::Worker => (
                    format!("testharness_worker{grid}.js"),
                    with_suffix(&output_files.offscreen, ".worker.js"),
                ),
            };
            fs::write(&path, engine.render(&template, ctx)?)?;
        }
        Ok(())
    }

    /// Generate every file for this grid under the given output
    /// directories.
    pub fn generate(
        &mut self,
        engine: &TemplateEngine,
        rasterizer: &dyn Rasterizer,
        output_dirs: &OutputPaths,
    ) -> Result<(), GenError> {
        self.generate_raster_images(rasterizer, output_dirs)?;

        let output_files = output_dirs.sub_path(&self.file_name);
        if self.template_type().is_reference() {
            self.write_reference_test(engine, &output_files)
        } else {
            self.write_testharness_test(engine, &output_files)
        }
    }
}

/// Append `suffix` to a file stem. Unlike `set_extension` this keeps dots
/// already in the stem intact.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut path = stem.to_path_buf().into_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::CommandRasterizer;

    fn param_map(pairs: &[(&str, Value)]) -> ParamMap {
        let mut m = ParamMap::new();
        for (k, v) in pairs {
            set(&mut m, k, v.clone());
        }
        m
    }

    fn seed_grid(pairs: &[(&str, Value)]) -> VariantGrid {
        VariantGrid::new(vec![Variant::create_with_defaults(&param_map(pairs))], 1)
    }

    fn options(names: &[&str]) -> Vec<DimensionOption> {
        names
            .iter()
            .map(|n| (n.to_string(), ParamMap::new()))
            .collect()
    }

    fn generate_into(
        grid: &mut VariantGrid,
        engine: &TemplateEngine,
    ) -> (tempfile::TempDir, OutputPaths) {
        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        dirs.mkdir().unwrap();
        grid.generate(engine, &CommandRasterizer, &dirs).unwrap();
        (dir, dirs)
    }

    #[test]
    fn test_add_dimension_first_dimension_varies_slowest() {
        let grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .add_dimension(&options(&["a", "b", "c"]))
            .add_dimension(&options(&["1", "2"]));

        assert_eq!(grid.variants().len(), 6);
        assert_eq!(grid.grid_width(), 3);
        let names: Vec<String> = grid
            .variants()
            .iter()
            .map(|v| v.grid_variant_names().join("."))
            .collect();
        assert_eq!(names, ["a.1", "b.1", "c.1", "a.2", "b.2", "c.2"]);
    }

    #[test]
    fn test_explicit_grid_width_survives_dimensions() {
        let grid = seed_grid(&[("name", Value::from("t"))]);
        let grid = VariantGrid::new(grid.variants().to_vec(), 5)
            .add_dimension(&options(&["a", "b"]));
        assert_eq!(grid.grid_width(), 5);
    }

    #[test]
    fn test_merge_params_appends_file_variant_names() {
        let grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .merge_params("red", &param_map(&[("color", Value::from("#f00"))]));
        assert_eq!(get_str(grid.variants()[0].params(), "name"), Some("t.red"));
        assert_eq!(get_str(grid.variants()[0].params(), "color"), Some("#f00"));
    }

    #[test]
    fn test_single_variant_grid_adopts_variant_params() {
        let mut grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))]);
        grid.finalize(&TemplateEngine::with_builtins()).unwrap();
        assert_eq!(grid.file_name(), "t");
        assert_eq!(grid.canvas_types().len(), 3);
        let ctx = &grid.context_params()[&CanvasType::HtmlCanvas];
        assert_eq!(get_str(ctx, "code"), Some("x;"));
    }

    #[test]
    fn test_grid_params_wrap_member_variants() {
        let mut grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .add_dimension(&options(&["a", "b"]));
        grid.finalize(&TemplateEngine::with_builtins()).unwrap();

        let ctx = &grid.context_params()[&CanvasType::HtmlCanvas];
        match params::get(ctx, "variants") {
            Some(Value::Sequence(members)) => assert_eq!(members.len(), 2),
            other => panic!("expected a member list, got {other:?}"),
        }
        assert_eq!(params::get(ctx, "grid_width"), Some(&Value::from(2u64)));
        assert_eq!(get_str(ctx, "name"), Some("t"));
    }

    #[test]
    fn test_divergent_shared_field_is_an_error() {
        let size_overlay = param_map(&[(
            "size",
            Value::Sequence(vec![Value::from(200), Value::from(50)]),
        )]);
        let mut grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .add_dimension(&[
                ("a".to_string(), ParamMap::new()),
                ("b".to_string(), size_overlay),
            ]);
        // size is not a shared grid field, but finalize checks file-level
        // uniqueness through the grid params; divergence shows up when
        // cairo compositing asks for the unique size.
        grid.finalize(&TemplateEngine::with_builtins()).unwrap();
        let err = grid.unique_size(CanvasType::HtmlCanvas).unwrap_err();
        assert!(matches!(err, DefinitionError::InconsistentField { field, .. } if field == "size"));
    }

    #[test]
    fn test_divergent_file_name_is_an_error() {
        let mut grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .add_dimension(&[
                ("a".to_string(), ParamMap::new()),
                (
                    "b".to_string(),
                    param_map(&[("name", Value::from("other"))]),
                ),
            ]);
        let err = grid.finalize(&TemplateEngine::with_builtins()).unwrap_err();
        assert!(matches!(err, DefinitionError::InconsistentField { field, .. } if field == "file_name"));
    }

    #[test]
    fn test_testharness_file_suffixes() {
        let mut grid = seed_grid(&[("name", Value::from("2d.fill")), ("code", Value::from("x;"))]);
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();
        let (_tmp, dirs) = generate_into(&mut grid, &engine);

        assert!(dirs.element.join("2d.fill.html").exists());
        assert!(dirs.offscreen.join("2d.fill.html").exists());
        assert!(dirs.offscreen.join("2d.fill.worker.js").exists());
    }

    #[test]
    fn test_reference_file_suffixes_worker_reuses_offscreen_reference() {
        let mut grid = seed_grid(&[
            ("name", Value::from("2d.ref")),
            ("code", Value::from("x;")),
            ("reference", Value::from("y;")),
        ]);
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();
        let (_tmp, dirs) = generate_into(&mut grid, &engine);

        assert!(dirs.element.join("2d.ref.html").exists());
        assert!(dirs.element.join("2d.ref-expected.html").exists());
        assert!(dirs.offscreen.join("2d.ref.html").exists());
        assert!(dirs.offscreen.join("2d.ref-expected.html").exists());
        assert!(dirs.offscreen.join("2d.ref.w.html").exists());
        // All variants enable the same offscreen contexts, so the worker
        // test points at the offscreen reference.
        assert!(!dirs.offscreen.join("2d.ref.w-expected.html").exists());
        let worker_test = fs::read_to_string(dirs.offscreen.join("2d.ref.w.html")).unwrap();
        assert!(worker_test.contains("href=\"2d.ref-expected.html\""));
    }

    #[test]
    fn test_reference_worker_gets_own_reference_when_grids_differ() {
        let mut grid = seed_grid(&[
            ("name", Value::from("2d.ref")),
            ("code", Value::from("x;")),
            ("reference", Value::from("y;")),
        ])
        .add_dimension(&[
            ("a".to_string(), ParamMap::new()),
            (
                "b".to_string(),
                param_map(&[(
                    "canvas_types",
                    Value::Sequence(vec![Value::from("HtmlCanvas"), Value::from("Worker")]),
                )]),
            ),
        ]);
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();
        let (_tmp, dirs) = generate_into(&mut grid, &engine);

        assert!(dirs.offscreen.join("2d.ref.w-expected.html").exists());
        let worker_test = fs::read_to_string(dirs.offscreen.join("2d.ref.w.html")).unwrap();
        assert!(worker_test.contains("href=\"2d.ref.w-expected.html\""));
    }

    #[test]
    fn test_expected_in_multi_variant_grid_rejected() {
        let mut grid = seed_grid(&[
            ("name", Value::from("t")),
            ("code", Value::from("x;")),
            ("expected", Value::from("green")),
        ])
        .add_dimension(&options(&["a", "b"]));
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        dirs.mkdir().unwrap();
        let err = grid
            .generate(&engine, &CommandRasterizer, &dirs)
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Definition(DefinitionError::ExpectedInGrid)
        ));
    }

    #[test]
    fn test_expected_in_reference_test_rejected() {
        let mut grid = seed_grid(&[
            ("name", Value::from("t")),
            ("code", Value::from("x;")),
            ("reference", Value::from("y;")),
            ("expected", Value::from("green")),
        ]);
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        dirs.mkdir().unwrap();
        let err = grid
            .generate(&engine, &CommandRasterizer, &dirs)
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Definition(DefinitionError::ExpectedInReference)
        ));
    }

    #[test]
    fn test_cairo_reference_grid_composites_one_png() {
        let mut grid = seed_grid(&[
            ("name", Value::from("t")),
            ("code", Value::from("x;")),
            ("cairo_reference", Value::from("fill 0 255 0 255")),
        ])
        .add_dimension(&options(&["a", "b"]));
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();
        let (_tmp, dirs) = generate_into(&mut grid, &engine);

        assert!(dirs.element.join("t.png").exists());
        assert!(dirs.offscreen.join("t.png").exists());
        let image = image::open(dirs.element.join("t.png")).unwrap();
        // Two 100x50 cells side by side.
        assert_eq!(image.width(), 200);
        assert_eq!(image.height(), 50);
        let test_page = fs::read_to_string(dirs.element.join("t.html")).unwrap();
        assert!(test_page.contains("t-expected.html"));
        let ref_page = fs::read_to_string(dirs.element.join("t-expected.html")).unwrap();
        assert!(ref_page.contains("src=\"t.png\""));
    }

    #[test]
    fn test_cairo_reference_missing_on_one_variant_rejected() {
        let mut grid = seed_grid(&[("name", Value::from("t")), ("code", Value::from("x;"))])
            .add_dimension(&[
                (
                    "a".to_string(),
                    param_map(&[("cairo_reference", Value::from("fill 0 255 0 255"))]),
                ),
                (
                    "b".to_string(),
                    param_map(&[("cairo_reference", Value::from(""))]),
                ),
            ]);
        let engine = TemplateEngine::with_builtins();
        grid.finalize(&engine).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        dirs.mkdir().unwrap();
        let err = grid
            .generate(&engine, &CommandRasterizer, &dirs)
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Definition(DefinitionError::MissingCairoReference)
        ));
    }
}
