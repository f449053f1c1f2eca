//! Command-line interface
//!
//! `testgen <CATALOG>` generates the full test tree; `testgen
//! --self-test` runs the embedded macro-expander checks and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::driver;
use crate::macros;
use crate::raster::CommandRasterizer;
use crate::template;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Generate canvas conformance tests from YAML definitions
#[derive(Parser)]
#[command(name = "testgen")]
#[command(about = "Generate canvas conformance tests from YAML definitions")]
#[command(version)]
pub struct Cli {
    /// YAML catalog mapping test name prefixes to output sub-directories
    #[arg(required_unless_present = "self_test")]
    pub catalog: Option<PathBuf>,

    /// Directory containing the *.yaml test definition files
    #[arg(long, default_value = "yaml")]
    pub defs: PathBuf,

    /// Root directory receiving the element/ and offscreen/ trees
    #[arg(long, default_value = "..")]
    pub out: PathBuf,

    /// Run the embedded macro-expander self checks and exit
    #[arg(long)]
    pub self_test: bool,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if cli.self_test {
        return self_test();
    }

    let Some(catalog) = cli.catalog else {
        eprintln!("Error: missing catalog file argument");
        return ExitCode::from(EXIT_INVALID_ARGS);
    };

    match driver::generate_test_files(&catalog, &cli.defs, &cli.out, &CommandRasterizer) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run a handful of end-to-end expander checks against known-good output.
fn self_test() -> ExitCode {
    let failures = run_self_checks();
    if failures == 0 {
        println!("all self tests passed");
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{failures} self test(s) failed");
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the embedded expander checks, returning the failure count.
fn run_self_checks() -> u32 {
    fn check(failures: &mut u32, name: &str, actual: &str, expected: &str) {
        if actual == expected {
            println!("ok {name}");
        } else {
            eprintln!("FAIL {name}: expected {expected:?}, got {actual:?}");
            *failures += 1;
        }
    }

    fn check_expansion(failures: &mut u32, name: &str, code: &str, expected: &str) {
        match macros::expand_test_code(code) {
            Ok(out) => check(failures, name, &out, expected),
            Err(e) => {
                eprintln!("FAIL {name}: {e}");
                *failures += 1;
            }
        }
    }

    let mut failures = 0u32;

    check_expansion(
        &mut failures,
        "nonfinite",
        "@nonfinite ctx.moveTo(<0 Infinity>, <0 NaN>);",
        "ctx.moveTo(Infinity, 0);\nctx.moveTo(0, NaN);\nctx.moveTo(Infinity, NaN);",
    );
    check_expansion(
        &mut failures,
        "pixel",
        "@assert pixel 50,25 == 0,255,0,255;",
        "_assertPixel(canvas, 50,25, 0,255,0,255);",
    );
    check_expansion(
        &mut failures,
        "throws",
        "@assert throws TypeError ctx.fill(null);",
        "assert_throws_js(TypeError, function() { ctx.fill(null); });",
    );
    check_expansion(
        &mut failures,
        "label escaping",
        "@assert arr[i] === 1;",
        "_assertSame(arr[i], 1, \"arr[\\\"\"+(i)+\"\\\"]\", \"1\");",
    );

    check(
        &mut failures,
        "indent filter",
        &template::indent_filter("line1\nline2\n", 2),
        "line1\n  line2\n",
    );
    check(
        &mut failures,
        "double quote escape",
        &macros::double_quote_escape(r#"say "hi"\now"#),
        r#"say \"hi\"\\now"#,
    );

    failures
}
