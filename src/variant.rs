//! Test variants
//!
//! A [`Variant`] is one concrete, fully parameterized test instance. It
//! starts as the base description with defaults filled in, accumulates
//! parameter overlays and naming suffixes while dimensions are expanded,
//! and is finalized exactly once: derived fields are computed, inline
//! templates rendered, and every code-bearing field macro-expanded per
//! enabled execution context.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;

use crate::error::{DefinitionError, GenError};
use crate::macros::{expand_test_code, remove_extra_newlines};
use crate::params::{
    self, append_dotted, contains, display_value, get, get_bool_or, get_str, push_str, set,
    ParamMap,
};
use crate::paths::OutputPaths;
use crate::raster::{save_png, Rasterizer};
use crate::template::{has_markers, TemplateEngine};

/// Execution context a test instance is materialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanvasType {
    HtmlCanvas,
    OffscreenCanvas,
    Worker,
}

impl CanvasType {
    pub const ALL: [CanvasType; 3] = [
        CanvasType::HtmlCanvas,
        CanvasType::OffscreenCanvas,
        CanvasType::Worker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanvasType::HtmlCanvas => "HtmlCanvas",
            CanvasType::OffscreenCanvas => "OffscreenCanvas",
            CanvasType::Worker => "Worker",
        }
    }

    pub fn parse(s: &str) -> Option<CanvasType> {
        match s {
            "HtmlCanvas" => Some(CanvasType::HtmlCanvas),
            "OffscreenCanvas" => Some(CanvasType::OffscreenCanvas),
            "Worker" => Some(CanvasType::Worker),
            _ => None,
        }
    }
}

/// How a test's outcome is judged, derived from which reference field the
/// description carries. At most one of the three reference fields may be
/// present; none means an assertion-based testharness test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateType {
    Testharness,
    Reference,
    HtmlReference,
    CairoReference,
}

impl TemplateType {
    pub fn is_reference(&self) -> bool {
        !matches!(self, TemplateType::Testharness)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Testharness => "testharness",
            TemplateType::Reference => "reference",
            TemplateType::HtmlReference => "html_reference",
            TemplateType::CairoReference => "cairo_reference",
        }
    }
}

/// Stock expected images for the fixed-color expected outcomes.
const GREEN_IMAGE: &str = "/images/green-100x50.png";
const CLEAR_IMAGE: &str = "/images/clear-100x50.png";

#[derive(Debug, Clone)]
pub struct Variant {
    /// Raw parameters, as specified in YAML plus accumulated overlays.
    params: ParamMap,
    /// Parameters rendered for each enabled canvas type. Populated by
    /// `finalize`.
    context_params: BTreeMap<CanvasType, ParamMap>,
    canvas_types: BTreeSet<CanvasType>,
    template_type: Option<TemplateType>,
}

impl Variant {
    /// Create a variant from a test description, adding default values
    /// for the parameters the expansion machinery relies on.
    pub fn create_with_defaults(test: &ParamMap) -> Variant {
        let mut defaults = ParamMap::new();
        set(&mut defaults, "desc", Value::from(""));
        set(
            &mut defaults,
            "size",
            Value::Sequence(vec![Value::from(100), Value::from(50)]),
        );
        // Test name, ultimately used as the file name. File-variant
        // dimension names get appended to it to keep file names unique.
        set(&mut defaults, "name", Value::from(""));
        set(&mut defaults, "file_variant_names", Value::Sequence(Vec::new()));
        set(&mut defaults, "grid_variant_names", Value::Sequence(Vec::new()));
        set(&mut defaults, "variant_names", Value::Sequence(Vec::new()));
        set(&mut defaults, "file_variant_name", Value::from(""));
        set(&mut defaults, "grid_variant_name", Value::from(""));
        set(&mut defaults, "variant_name", Value::from(""));
        set(&mut defaults, "images", Value::Sequence(Vec::new()));
        set(&mut defaults, "svgimages", Value::Sequence(Vec::new()));
        set(&mut defaults, "fonts", Value::Sequence(Vec::new()));

        Variant {
            params: params::merged(&defaults, test),
            context_params: BTreeMap::new(),
            canvas_types: BTreeSet::new(),
            template_type: None,
        }
    }

    /// This variant's raw parameter mapping.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Per-canvas-type parameter mappings. Empty before finalization.
    pub fn context_params(&self) -> &BTreeMap<CanvasType, ParamMap> {
        &self.context_params
    }

    /// Canvas types this variant is enabled for. Empty before
    /// finalization.
    pub fn canvas_types(&self) -> &BTreeSet<CanvasType> {
        &self.canvas_types
    }

    pub fn template_type(&self) -> TemplateType {
        self.template_type.expect("variant not finalized")
    }

    pub fn file_name(&self) -> &str {
        get_str(&self.params, "file_name").unwrap_or("")
    }

    pub fn grid_variant_names(&self) -> Vec<String> {
        params::str_list(&self.params, "grid_variant_names")
    }

    /// A new variant merging an overlay over this variant's parameters.
    /// The base is deep-copied first: sibling expansion branches never
    /// alias state.
    pub fn merge_params(&self, overlay: &ParamMap) -> Variant {
        Variant {
            params: params::merged(&self.params, overlay),
            context_params: BTreeMap::new(),
            canvas_types: BTreeSet::new(),
            template_type: None,
        }
    }

    fn add_variant_name(&mut self, name: &str) {
        append_dotted(&mut self.params, "variant_name", name);
        push_str(&mut self.params, "variant_names", name);
    }

    /// Append a variant name shown in the grid cell label.
    pub fn with_grid_variant_name(mut self, name: &str) -> Variant {
        self.add_variant_name(name);
        append_dotted(&mut self.params, "grid_variant_name", name);
        push_str(&mut self.params, "grid_variant_names", name);
        self
    }

    /// Append a variant name included in the generated file name.
    pub fn with_file_variant_name(mut self, name: &str) -> Variant {
        self.add_variant_name(name);
        append_dotted(&mut self.params, "file_variant_name", name);
        push_str(&mut self.params, "file_variant_names", name);
        if get_bool_or(&self.params, "append_variants_to_name", true) {
            let appended = format!("{}.{name}", get_str(&self.params, "name").unwrap_or(""));
            set(&mut self.params, "name", Value::from(appended));
        }
        self
    }

    /// Render a parameter in place when its value embeds template markers.
    fn render_param(
        &mut self,
        engine: &TemplateEngine,
        name: &str,
    ) -> Result<(), DefinitionError> {
        if let Some(text) = get_str(&self.params, name) {
            if has_markers(text) {
                let rendered = engine.render_str(&text.to_string(), &self.params)?;
                set(&mut self.params, name, Value::from(rendered));
            }
        }
        Ok(())
    }

    fn compute_file_name(&self) -> String {
        let mut file_name = get_str(&self.params, "name").unwrap_or("").to_string();
        if contains(&self.params, "manual") {
            file_name.push_str("-manual");
        }
        file_name
    }

    fn parse_canvas_types(&self) -> Result<BTreeSet<CanvasType>, DefinitionError> {
        let declared = match get(&self.params, "canvas_types") {
            None => return Ok(CanvasType::ALL.into_iter().collect()),
            Some(Value::Sequence(seq)) => seq,
            Some(other) => {
                return Err(DefinitionError::InvalidCanvasTypes {
                    types: vec![display_value(other)],
                })
            }
        };
        let mut types = BTreeSet::new();
        let mut invalid = Vec::new();
        for value in declared {
            match value.as_str().and_then(CanvasType::parse) {
                Some(t) => {
                    types.insert(t);
                }
                None => invalid.push(display_value(value)),
            }
        }
        if !invalid.is_empty() {
            return Err(DefinitionError::InvalidCanvasTypes { types: invalid });
        }
        Ok(types)
    }

    fn derive_template_type(&self) -> Result<TemplateType, DefinitionError> {
        let declared = ["reference", "html_reference", "cairo_reference"]
            .iter()
            .filter(|field| contains(&self.params, field))
            .count();
        if declared > 1 {
            return Err(DefinitionError::MultipleReferences {
                name: get_str(&self.params, "name").unwrap_or("").to_string(),
            });
        }
        if contains(&self.params, "reference") {
            Ok(TemplateType::Reference)
        } else if contains(&self.params, "html_reference") {
            Ok(TemplateType::HtmlReference)
        } else if contains(&self.params, "cairo_reference") {
            Ok(TemplateType::CairoReference)
        } else {
            Ok(TemplateType::Testharness)
        }
    }

    fn invalid_size(&self) -> DefinitionError {
        DefinitionError::InvalidSize {
            name: get_str(&self.params, "name").unwrap_or("").to_string(),
            value: get(&self.params, "size")
                .map(display_value)
                .unwrap_or_else(|| "null".to_string()),
        }
    }

    /// Validate `size` as a two-element numeric pair.
    fn check_size(&self) -> Result<(u32, u32), DefinitionError> {
        let seq = match get(&self.params, "size") {
            Some(Value::Sequence(seq)) if seq.len() == 2 => seq,
            _ => return Err(self.invalid_size()),
        };
        let width = seq[0].as_u64().ok_or_else(|| self.invalid_size())?;
        let height = seq[1].as_u64().ok_or_else(|| self.invalid_size())?;
        Ok((width as u32, height as u32))
    }

    /// Canvas size as a width/height pair. Only valid after finalization.
    pub fn size(&self) -> (u32, u32) {
        self.check_size().expect("size validated at finalization")
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        // A fully transparent probe against a green expectation is almost
        // certainly an authoring mistake, but not necessarily: flag it
        // without blocking generation.
        if get_str(&self.params, "expected") == Some("green") {
            if let Some(code) = get_str(&self.params, "code") {
                let probe = regex::Regex::new(r"@assert pixel .* 0,0,0,0;")
                    .expect("static pattern compiles");
                if probe.is_match(code) {
                    eprintln!(
                        "Probable incorrect pixel test in {}",
                        get_str(&self.params, "name").unwrap_or("")
                    );
                }
            }
        }

        let valid: &[&str] = if self.template_type() == TemplateType::Testharness {
            &["sync", "async", "promise"]
        } else {
            &["promise"]
        };
        if let Some(test_type) = get_str(&self.params, "test_type") {
            if !valid.contains(&test_type) {
                return Err(DefinitionError::InvalidTestType {
                    test_type: test_type.to_string(),
                    valid: valid.join(", "),
                });
            }
        }
        Ok(())
    }

    /// Finalize this variant: assign its id, compute derived fields, and
    /// build the per-canvas-type parameter mappings with all code-bearing
    /// fields preprocessed. Called exactly once, by the owning grid.
    pub fn finalize(
        &mut self,
        engine: &TemplateEngine,
        id: usize,
    ) -> Result<(), DefinitionError> {
        set(&mut self.params, "id", Value::from(id as u64));
        for name in ["attributes", "desc", "expected", "name"] {
            self.render_param(engine, name)?;
        }
        let file_name = self.compute_file_name();
        set(&mut self.params, "file_name", Value::from(file_name));
        self.canvas_types = self.parse_canvas_types()?;
        self.template_type = Some(self.derive_template_type()?);
        self.check_size()?;

        for canvas_type in self.canvas_types.clone() {
            let mut ctx = self.params.clone();
            set(&mut ctx, "canvas_type", Value::from(canvas_type.as_str()));
            for field in ["code", "reference", "html_reference", "cairo_reference"] {
                if let Some(code) = get_str(&ctx, field).map(str::to_string) {
                    let processed = preprocess_code(engine, &code, &ctx)?;
                    set(&mut ctx, field, Value::from(processed));
                }
            }
            self.context_params.insert(canvas_type, ctx);
        }

        self.validate()
    }

    /// Create the expected image for an assertion-based test and record
    /// its path in the `expected_img` parameter. Expected images are only
    /// used by element-canvas tests.
    pub fn generate_expected_image(
        &mut self,
        rasterizer: &dyn Rasterizer,
        output_dirs: &OutputPaths,
    ) -> Result<(), GenError> {
        let Some(ctx) = self.context_params.get_mut(&CanvasType::HtmlCanvas) else {
            return Ok(());
        };
        let Some(expected) = get_str(ctx, "expected").map(str::to_string) else {
            return Ok(());
        };

        match expected.as_str() {
            "green" => {
                set(ctx, "expected_img", Value::from(GREEN_IMAGE));
                return Ok(());
            }
            "clear" => {
                set(ctx, "expected_img", Value::from(CLEAR_IMAGE));
                return Ok(());
            }
            _ => {}
        }

        let header = regex::Regex::new(r"^size (\d+) (\d+)\n?").expect("static pattern compiles");
        let caps = header
            .captures(&expected)
            .ok_or_else(|| DefinitionError::InvalidExpected {
                name: get_str(ctx, "name").unwrap_or("").to_string(),
            })?;
        let width: u32 = caps[1].parse().map_err(|_| DefinitionError::InvalidExpected {
            name: get_str(ctx, "name").unwrap_or("").to_string(),
        })?;
        let height: u32 = caps[2].parse().map_err(|_| DefinitionError::InvalidExpected {
            name: get_str(ctx, "name").unwrap_or("").to_string(),
        })?;
        let code = &expected[caps.get(0).map(|m| m.end()).unwrap_or(0)..];

        let image = rasterizer.rasterize(code, width, height)?;
        let img_filename = format!("{}.png", get_str(ctx, "name").unwrap_or(""));
        save_png(&image, &output_dirs.sub_path(&img_filename).element)?;
        set(ctx, "expected_img", Value::from(img_filename));
        Ok(())
    }
}

/// Preprocess a code-bearing field: fold line continuations, render any
/// embedded templates to a fixpoint, then expand `@` macros.
fn preprocess_code(
    engine: &TemplateEngine,
    code: &str,
    ctx: &ParamMap,
) -> Result<String, DefinitionError> {
    let code = remove_extra_newlines(code);
    let code = if has_markers(&code) {
        let hint = get_str(ctx, "name").unwrap_or("code").to_string();
        engine.render_str_fixpoint(&code, ctx, &hint)?
    } else {
        code
    };
    expand_test_code(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_map(pairs: &[(&str, Value)]) -> ParamMap {
        let mut m = ParamMap::new();
        for (k, v) in pairs {
            set(&mut m, k, v.clone());
        }
        m
    }

    fn finalized(pairs: &[(&str, Value)]) -> Variant {
        let mut variant = Variant::create_with_defaults(&test_map(pairs));
        variant.finalize(&TemplateEngine::new(), 0).unwrap();
        variant
    }

    #[test]
    fn test_defaults_installed() {
        let variant = Variant::create_with_defaults(&test_map(&[("name", Value::from("t"))]));
        assert_eq!(get_str(variant.params(), "desc"), Some(""));
        assert_eq!(get_str(variant.params(), "variant_name"), Some(""));
    }

    #[test]
    fn test_defaults_do_not_override_description() {
        let variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            ("desc", Value::from("draws a box")),
        ]));
        assert_eq!(get_str(variant.params(), "desc"), Some("draws a box"));
    }

    #[test]
    fn test_file_variant_name_appends_to_name() {
        let variant = Variant::create_with_defaults(&test_map(&[("name", Value::from("t"))]))
            .with_file_variant_name("red")
            .with_file_variant_name("wide");
        assert_eq!(get_str(variant.params(), "name"), Some("t.red.wide"));
        assert_eq!(get_str(variant.params(), "file_variant_name"), Some("red.wide"));
        assert_eq!(get_str(variant.params(), "variant_name"), Some("red.wide"));
    }

    #[test]
    fn test_append_variants_to_name_opt_out() {
        let variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            ("append_variants_to_name", Value::from(false)),
        ]))
        .with_file_variant_name("red");
        assert_eq!(get_str(variant.params(), "name"), Some("t"));
        assert_eq!(get_str(variant.params(), "file_variant_name"), Some("red"));
    }

    #[test]
    fn test_grid_variant_name_leaves_file_name_alone() {
        let variant = Variant::create_with_defaults(&test_map(&[("name", Value::from("t"))]))
            .with_grid_variant_name("blue");
        assert_eq!(get_str(variant.params(), "name"), Some("t"));
        assert_eq!(get_str(variant.params(), "grid_variant_name"), Some("blue"));
    }

    #[test]
    fn test_merge_params_isolates_branches() {
        let base = Variant::create_with_defaults(&test_map(&[("name", Value::from("t"))]));
        let a = base.merge_params(&test_map(&[("color", Value::from("red"))]));
        let b = base.merge_params(&test_map(&[("color", Value::from("blue"))]));
        assert_eq!(get_str(a.params(), "color"), Some("red"));
        assert_eq!(get_str(b.params(), "color"), Some("blue"));
        assert_eq!(get_str(base.params(), "color"), None);
    }

    #[test]
    fn test_finalize_derives_fields() {
        let variant = finalized(&[("name", Value::from("2d.fill")), ("code", Value::from("ctx;"))]);
        assert_eq!(variant.file_name(), "2d.fill");
        assert_eq!(variant.template_type(), TemplateType::Testharness);
        assert_eq!(variant.canvas_types().len(), 3);
        assert_eq!(variant.size(), (100, 50));
    }

    #[test]
    fn test_manual_suffix() {
        let variant = finalized(&[("name", Value::from("t")), ("manual", Value::from(true))]);
        assert_eq!(variant.file_name(), "t-manual");
    }

    #[test]
    fn test_canvas_types_restriction() {
        let variant = finalized(&[
            ("name", Value::from("t")),
            (
                "canvas_types",
                Value::Sequence(vec![Value::from("Worker")]),
            ),
        ]);
        assert_eq!(
            variant.canvas_types().iter().copied().collect::<Vec<_>>(),
            vec![CanvasType::Worker]
        );
    }

    #[test]
    fn test_invalid_canvas_type_is_an_error() {
        let mut variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            (
                "canvas_types",
                Value::Sequence(vec![Value::from("PaperCanvas")]),
            ),
        ]));
        let err = variant.finalize(&TemplateEngine::new(), 0).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidCanvasTypes { .. }));
    }

    #[test]
    fn test_multiple_references_rejected() {
        let mut variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            ("reference", Value::from("ctx;")),
            ("html_reference", Value::from("<b>x</b>")),
        ]));
        let err = variant.finalize(&TemplateEngine::new(), 0).unwrap_err();
        assert!(matches!(err, DefinitionError::MultipleReferences { name } if name == "t"));
    }

    #[test]
    fn test_malformed_size_rejected() {
        let mut variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            ("size", Value::Sequence(vec![Value::from(100)])),
        ]));
        let err = variant.finalize(&TemplateEngine::new(), 0).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidSize { .. }));
    }

    #[test]
    fn test_invalid_test_type_for_reference() {
        let mut variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("t")),
            ("reference", Value::from("ctx;")),
            ("test_type", Value::from("sync")),
        ]));
        let err = variant.finalize(&TemplateEngine::new(), 0).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidTestType { .. }));
    }

    #[test]
    fn test_code_is_macro_expanded_per_context() {
        let variant = finalized(&[
            ("name", Value::from("t")),
            ("code", Value::from("@assert pixel 0,0 == 0,255,0,255;")),
        ]);
        let ctx = &variant.context_params()[&CanvasType::HtmlCanvas];
        assert_eq!(
            get_str(ctx, "code"),
            Some("_assertPixel(canvas, 0,0, 0,255,0,255);")
        );
        assert_eq!(get_str(ctx, "canvas_type"), Some("HtmlCanvas"));
    }

    #[test]
    fn test_inline_template_in_name() {
        let mut variant = Variant::create_with_defaults(&test_map(&[
            ("name", Value::from("2d.{{ sub_name }}")),
            ("sub_name", Value::from("fill")),
        ]));
        variant.finalize(&TemplateEngine::new(), 0).unwrap();
        assert_eq!(variant.file_name(), "2d.fill");
    }

    #[test]
    fn test_expected_green_uses_stock_image() {
        let mut variant = finalized(&[
            ("name", Value::from("t")),
            ("expected", Value::from("green")),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        variant
            .generate_expected_image(&crate::raster::CommandRasterizer, &dirs)
            .unwrap();
        let ctx = &variant.context_params()[&CanvasType::HtmlCanvas];
        assert_eq!(get_str(ctx, "expected_img"), Some(GREEN_IMAGE));
    }

    #[test]
    fn test_expected_rasterized_to_png() {
        let mut variant = finalized(&[
            ("name", Value::from("t")),
            ("expected", Value::from("size 4 2\nfill 0 255 0 255")),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dirs = OutputPaths::new(dir.path());
        variant
            .generate_expected_image(&crate::raster::CommandRasterizer, &dirs)
            .unwrap();
        assert!(dirs.element.join("t.png").exists());
        let ctx = &variant.context_params()[&CanvasType::HtmlCanvas];
        assert_eq!(get_str(ctx, "expected_img"), Some("t.png"));
    }
}
