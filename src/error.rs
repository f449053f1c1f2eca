//! Error types for test generation
//!
//! All authoring mistakes in test definitions surface as a
//! [`DefinitionError`]. The generation driver wraps those, together with
//! IO and encoding failures, into [`GenError`].

use thiserror::Error;

/// An invalid test definition was encountered.
///
/// Raised at the point of detection; the driver aborts the whole run
/// rather than skipping the offending test, since the generated corpus is
/// only useful when complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    /// A `@nonfinite` argument did not match the `<valid invalid...>` form
    #[error("expected nonfinite arg to match format \"<(.*)>\", but was: {arg}")]
    NonfiniteArg { arg: String },

    /// An unrecognized `@` annotation survived macro expansion
    #[error("unexpanded macro in test code: {line}")]
    UnexpandedMacro { line: String },

    /// A named template was requested that is not registered
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// Malformed placeholder syntax in a template
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),

    /// A template used a filter the engine does not provide
    #[error("unknown template filter '{0}'")]
    UnknownFilter(String),

    /// Re-rendering never reached a fixpoint (circular parameter references)
    #[error("template rendering did not converge after {limit} iterations: {hint}")]
    TemplateNonConvergence { limit: usize, hint: String },

    /// `canvas_types` contained unrecognized values
    #[error("invalid canvas_types: {types:?}. Accepted values are: [\"HtmlCanvas\", \"OffscreenCanvas\", \"Worker\"]")]
    InvalidCanvasTypes { types: Vec<String> },

    /// More than one reference kind declared on one test
    #[error("test {name} is invalid, only one of \"reference\", \"html_reference\" or \"cairo_reference\" can be specified at the same time")]
    MultipleReferences { name: String },

    /// `size` was not a two-element numeric array
    #[error("invalid canvas size \"{value}\" in test {name}. Expected an array with two numbers")]
    InvalidSize { name: String, value: String },

    /// `test_type` outside the set allowed for the test's template type
    #[error("invalid test_type: {test_type}. Valid values are: {valid}")]
    InvalidTestType { test_type: String, valid: String },

    /// `variants` was not a list of dimension mappings
    #[error("variants must be specified as a list of variant dimensions, \
             each dimension being a mapping from option name to parameters")]
    VariantsNotAList,

    /// `variants` and `variants_layout` lengths differ
    #[error("variants and variants_layout must be lists of the same size")]
    LayoutCountMismatch,

    /// A `variants_layout` entry outside the recognized kinds
    #[error("invalid variants_layout: {0}. Valid layouts are: single_file, multi_files")]
    InvalidLayout(String),

    /// Explicit `grid_width` was not an integer
    #[error("\"grid_width\" must be an integer")]
    InvalidGridWidth,

    /// Variants of one grid disagree on a shared field
    #[error("all variants in a variant grid must use the same value for \
             property \"{field}\". Got these values: {values}. Consider \
             specifying the property outside of grid variant dimensions \
             (in the base test definition or in a file variant dimension)")]
    InconsistentField { field: String, values: String },

    /// `cairo_reference` present on some but not all variants of a grid
    #[error("when used, \"cairo_reference\" must be specified for all test variants")]
    MissingCairoReference,

    /// `expected` and `cairo_reference` used together
    #[error("parameters \"expected\" and \"cairo_reference\" can't be both used at the same time")]
    ExpectedWithCairoReference,

    /// `expected` on a multi-variant grid
    #[error("parameter \"expected\" is not supported for variant grids")]
    ExpectedInGrid,

    /// `expected` on a reference test
    #[error("parameter \"expected\" is not supported in reference tests")]
    ExpectedInReference,

    /// An `expected` drawing block without the `size W H` header
    #[error("invalid \"expected\" in test {name}: must be \"green\", \"clear\" or start with \"size W H\"")]
    InvalidExpected { name: String },

    /// Two tests claimed the same artifact for overlapping canvas types
    #[error("test {identity} is defined twice for types {types:?}")]
    DuplicateTest {
        identity: String,
        types: Vec<String>,
    },

    /// No catalog prefix matched a test name
    #[error("test \"{name}\" has no defined target directory mapping")]
    NoSubDirMapping { name: String },

    /// The built-in rasterizer hit a statement it does not understand
    #[error("invalid raster command: {line}")]
    RasterCommand { line: String },

    /// The name→directory catalog was not a mapping of strings
    #[error("catalog file must be a mapping from name prefix to sub-directory")]
    CatalogFormat,

    /// A definition file was not a sequence of test mappings
    #[error("definition file {path} must contain a sequence of test mappings")]
    DefinitionFormat { path: String },

    /// A `bulk:` entry missing its `base`/`instances` structure
    #[error("bulk definitions require a \"base\" mapping and an \"instances\" list of mappings")]
    BulkFormat,
}

/// Top-level error for a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    /// Invalid test definition
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parse error in a definition or catalog file
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Image encoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// Invalid glob pattern while scanning the definitions directory
    #[error("glob error: {0}")]
    Glob(#[from] glob::PatternError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_field_names_offender() {
        let err = DefinitionError::InconsistentField {
            field: "size".to_string(),
            values: "[100, 50], [200, 50]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"size\""));
        assert!(msg.contains("[200, 50]"));
    }

    #[test]
    fn test_gen_error_wraps_definition_error() {
        let err: GenError = DefinitionError::InvalidGridWidth.into();
        assert!(matches!(err, GenError::Definition(_)));
        assert_eq!(err.to_string(), "\"grid_width\" must be an integer");
    }
}
