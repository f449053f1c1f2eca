//! Test-body macro expansion
//!
//! Test bodies embed a small `@...` annotation language that is rewritten
//! into plain assertion calls before the body lands in a template. The
//! rewrite is an ordered chain of pattern substitutions; the order is
//! load-bearing (`@nonfinite` can carry assertion text in its tail, so it
//! must fire before the `@assert throws` rules).

use regex::{Captures, Regex};

use crate::error::DefinitionError;

/// Escape backslashes and double quotes for embedding in a string literal.
pub fn double_quote_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape an expression for use as an assertion failure label.
///
/// On top of quote escaping, `[ident]` index expressions are rewritten so
/// the label shows the index's runtime value instead of its source text.
fn escape_js(s: &str) -> String {
    let escaped = double_quote_escape(s);
    rule(r"\[(\w+)\]")
        .replace_all(&escaped, r#"[\""+(${1})+"\"]"#)
        .into_owned()
}

/// Compile a rewrite pattern. All patterns are static literals.
fn rule(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static rewrite pattern compiles")
}

/// `replace_all` with a fallible rewriter.
fn try_replace_all(
    re: &Regex,
    text: &str,
    rewrite: impl Fn(&Captures) -> Result<String, DefinitionError>,
) -> Result<String, DefinitionError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always present");
        out.push_str(&text[last..whole.start()]);
        out.push_str(&rewrite(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand a `@nonfinite` argument cross-product into one call per case.
///
/// `argstr` is a comma-separated list of `<valid invalid1 invalid2 ...>`
/// groups (the invalid substitutes are usually Infinity/-Infinity/NaN).
/// The emitted order is fixed and relied upon by reviewers diffing the
/// generated output: every single-argument failure first (by argument
/// index, then substitute order), then every combination of two or more
/// arguments set to their first invalid substitute, enumerated depth-first
/// over increasing argument indices.
pub fn expand_nonfinite(
    method: &str,
    argstr: &str,
    tail: &str,
) -> Result<String, DefinitionError> {
    let mut args: Vec<Vec<&str>> = Vec::new();
    for arg in argstr.split(", ") {
        let inner = arg
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| DefinitionError::NonfiniteArg {
                arg: arg.to_string(),
            })?;
        args.push(inner.split(' ').collect());
    }

    let valid: Vec<&str> = args.iter().map(|a| a[0]).collect();
    let mut calls: Vec<Vec<&str>> = Vec::new();

    // Each argument alone, set to each of its invalid values.
    for (i, arg) in args.iter().enumerate() {
        for &substitute in &arg[1..] {
            let mut call = valid.clone();
            call[i] = substitute;
            calls.push(call);
        }
    }

    // Combinations of two or more arguments at their first invalid value
    // only; expanding all substitutes here would explode combinatorially.
    fn combine<'a>(
        args: &[Vec<&'a str>],
        call: &[&'a str],
        start: usize,
        depth: usize,
        calls: &mut Vec<Vec<&'a str>>,
    ) {
        for i in start..args.len() {
            if args[i].len() > 1 {
                let mut next = call.to_vec();
                next[i] = args[i][1];
                if depth > 0 {
                    calls.push(next.clone());
                }
                combine(args, &next, i + 1, depth + 1, calls);
            }
        }
    }
    combine(&args, &valid, 0, 0, &mut calls);

    let lines: Vec<String> = calls
        .iter()
        .map(|call| format!("{method}({}){tail}", call.join(", ")))
        .collect();
    Ok(lines.join("\n"))
}

/// Delete folded newlines: `\` at end of line removes the newline, `\-`
/// additionally swallows the next line's leading whitespace.
pub fn remove_extra_newlines(text: &str) -> String {
    let text = rule(r"\\\n").replace_all(text, "");
    rule(r"\\-\n\s*").replace_all(&text, "").into_owned()
}

/// Expand every `@...` annotation in a test body into plain statements.
///
/// Returns the body with no annotation markers left, or a
/// [`DefinitionError`] naming the first line still carrying one. The
/// expansion is idempotent: running it over its own output is a no-op.
pub fn expand_test_code(code: &str) -> Result<String, DefinitionError> {
    let code = code.replace(" @moz-todo", "");
    let code = code.replace("@moz-UniversalBrowserRead;", "");

    // Must come before the '@assert throws' rules: the tail may itself
    // contain assertion text.
    let code = try_replace_all(
        &rule(r"@nonfinite ([^(]+)\(([^)]+)\)(.*)"),
        &code,
        |caps| expand_nonfinite(&caps[1], &caps[2], &caps[3]),
    )?;

    let code = rule(r"@assert pixel (\d+,\d+) == (\d+,\d+,\d+,\d+);")
        .replace_all(&code, "_assertPixel(canvas, ${1}, ${2});");
    let code = rule(r"@assert pixel (\d+,\d+) ==~ (\d+,\d+,\d+,\d+);")
        .replace_all(&code, "_assertPixelApprox(canvas, ${1}, ${2}, 2);");
    let code = rule(r"@assert pixel (\d+,\d+) ==~ (\d+,\d+,\d+,\d+) \+/- (\d+);")
        .replace_all(&code, "_assertPixelApprox(canvas, ${1}, ${2}, ${3});");

    let code = rule(r"(?sm)@assert throws (\S+_ERR) (.*?);$")
        .replace_all(&code, "assert_throws_dom(\"${1}\", function() { ${2}; });");
    let code = rule(r"(?sm)@assert throws (\S+Error) (.*?);$")
        .replace_all(&code, "assert_throws_js(${1}, function() { ${2}; });");

    let code = rule(r"@assert (.*) === (.*);").replace_all(&code, |caps: &Captures| {
        format!(
            "_assertSame({}, {}, \"{}\", \"{}\");",
            &caps[1],
            &caps[2],
            escape_js(&caps[1]),
            escape_js(&caps[2])
        )
    });
    let code = rule(r"@assert (.*) !== (.*);").replace_all(&code, |caps: &Captures| {
        format!(
            "_assertDifferent({}, {}, \"{}\", \"{}\");",
            &caps[1],
            &caps[2],
            escape_js(&caps[1]),
            escape_js(&caps[2])
        )
    });
    let code = rule(r"@assert (.*) =~ (.*);")
        .replace_all(&code, "assert_regexp_match(${1}, ${2});");
    let code = rule(r"@assert (.*);").replace_all(&code, |caps: &Captures| {
        format!("_assert({}, \"{}\");", &caps[1], escape_js(&caps[1]))
    });

    if let Some(line) = code.lines().find(|line| line.contains('@')) {
        return Err(DefinitionError::UnexpandedMacro {
            line: line.trim().to_string(),
        });
    }

    Ok(code.into_owned())
}
