//! Built-in output templates
//!
//! One template per (comparison strategy, execution context) pair, each
//! with a `_grid` form used when several variants share one output file.
//! The reference-test element template doubles as the reference page for
//! element-style references: `is_test_reference` switches it between the
//! test body (`code`) and the reference body (`reference`).

use crate::template::TemplateEngine;

/// Register every built-in template under its canonical name.
pub fn register_builtins(engine: &mut TemplateEngine) {
    engine.add_template("testharness_element.html", TESTHARNESS_ELEMENT);
    engine.add_template("testharness_element_grid.html", TESTHARNESS_ELEMENT_GRID);
    engine.add_template("testharness_offscreen.html", TESTHARNESS_OFFSCREEN);
    engine.add_template("testharness_offscreen_grid.html", TESTHARNESS_OFFSCREEN_GRID);
    engine.add_template("testharness_worker.js", TESTHARNESS_WORKER);
    engine.add_template("testharness_worker_grid.js", TESTHARNESS_WORKER_GRID);
    engine.add_template("reftest_element.html", REFTEST_ELEMENT);
    engine.add_template("reftest_element_grid.html", REFTEST_ELEMENT_GRID);
    engine.add_template("reftest_offscreen.html", REFTEST_OFFSCREEN);
    engine.add_template("reftest_offscreen_grid.html", REFTEST_OFFSCREEN_GRID);
    engine.add_template("reftest_worker.html", REFTEST_WORKER);
    engine.add_template("reftest_worker_grid.html", REFTEST_WORKER_GRID);
    engine.add_template("reftest.html", REFTEST_HTML);
    engine.add_template("reftest_grid.html", REFTEST_HTML_GRID);
    engine.add_template("reftest_img.html", REFTEST_IMG);
    engine.add_template("reftest_img_grid.html", REFTEST_IMG);
}

const TESTHARNESS_ELEMENT: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
{% if timeout %}<meta name="timeout" content="{{ timeout }}">
{% endif %}<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>
<script src="/html/canvas/resources/canvas-tests.js"></script>
<link rel="stylesheet" href="/html/canvas/resources/canvas-tests.css">
<body class="show_output">

<h1>{{ name }}</h1>
<p class="desc">{{ desc }}</p>
{% if notes %}<p class="notes">{{ notes }}</p>
{% endif %}
<p class="output">Actual output:</p>
<canvas id="c" class="output" width="{{ size.0 }}" height="{{ size.1 }}"{{ attributes }}><p class="fallback">FAIL (fallback content)</p></canvas>
{% if expected_img %}<p class="output expectedtext">Expected output:</p><p><img src="{{ expected_img }}" class="output expected" id="expected" alt=""></p>
{% endif %}{% for image in images %}<img src="/images/{{ image }}" id="{{ image }}" class="resource">
{% endfor %}{% for svgimage in svgimages %}<svg id="{{ svgimage }}" class="resource"><image xlink:href="/images/{{ svgimage }}"></image></svg>
{% endfor %}{% for font in fonts %}<style>
@font-face {
  font-family: {{ font }};
  src: url("/fonts/{{ font }}.ttf");
}
</style>
{% endfor %}<ul id="d"></ul>
<script>
var t = async_test("{{ desc | double_quote_escape }}");
_addTest(function(canvas, ctx) {
  {{ code | indent(2) }}
});
</script>
"#;

const TESTHARNESS_ELEMENT_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
{% if timeout %}<meta name="timeout" content="{{ timeout }}">
{% endif %}<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>
<script src="/html/canvas/resources/canvas-tests.js"></script>
<link rel="stylesheet" href="/html/canvas/resources/canvas-tests.css">
<body class="show_output">

<h1>{{ name }}</h1>
<div style="display: grid; grid-template-columns: repeat({{ grid_width }}, max-content); gap: 4px">
{% for variant in variants %}<div>
  <p class="desc">{{ variant.grid_variant_name }}</p>
  <canvas id="c{{ variant.id }}" class="output" width="{{ variant.size.0 }}" height="{{ variant.size.1 }}"{{ variant.attributes }}></canvas>
</div>
{% endfor %}</div>
{% for image in images %}<img src="/images/{{ image }}" id="{{ image }}" class="resource">
{% endfor %}{% for font in fonts %}<style>
@font-face {
  font-family: {{ font }};
  src: url("/fonts/{{ font }}.ttf");
}
</style>
{% endfor %}<ul id="d"></ul>
<script>
{% for variant in variants %}(function() {
  var t = async_test("{{ variant.desc | double_quote_escape }} ({{ variant.grid_variant_name }})");
  t.step(function() {
    var canvas = document.getElementById("c{{ variant.id }}");
    var ctx = canvas.getContext('2d');
    {{ variant.code | indent(4) }}
    t.done();
  });
})();
{% endfor %}</script>
"#;

const TESTHARNESS_OFFSCREEN: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>OffscreenCanvas test: {{ name }}</title>
{% if timeout %}<meta name="timeout" content="{{ timeout }}">
{% endif %}<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>
<script src="/html/canvas/resources/canvas-tests.js"></script>
<script>
var t = async_test("{{ desc | double_quote_escape }}");
t.step(function() {
  var canvas = new OffscreenCanvas({{ size.0 }}, {{ size.1 }});
  var ctx = canvas.getContext('2d');
  {{ code | indent(2) }}
  t.done();
});
</script>
"#;

const TESTHARNESS_OFFSCREEN_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>OffscreenCanvas test: {{ name }}</title>
{% if timeout %}<meta name="timeout" content="{{ timeout }}">
{% endif %}<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>
<script src="/html/canvas/resources/canvas-tests.js"></script>
<script>
{% for variant in variants %}(function() {
  var t = async_test("{{ variant.desc | double_quote_escape }} ({{ variant.grid_variant_name }})");
  t.step(function() {
    var canvas = new OffscreenCanvas({{ variant.size.0 }}, {{ variant.size.1 }});
    var ctx = canvas.getContext('2d');
    {{ variant.code | indent(4) }}
    t.done();
  });
})();
{% endfor %}</script>
"#;

const TESTHARNESS_WORKER: &str = r#"// DO NOT EDIT! This test has been generated from a YAML definition.
// OffscreenCanvas test in a worker: {{ name }}
// Description: {{ desc }}

importScripts("/resources/testharness.js");
importScripts("/html/canvas/resources/canvas-tests.js");

var t = async_test("{{ desc | double_quote_escape }}");
t.step(function() {
  var canvas = new OffscreenCanvas({{ size.0 }}, {{ size.1 }});
  var ctx = canvas.getContext('2d');
  {{ code | indent(2) }}
  t.done();
});
done();
"#;

const TESTHARNESS_WORKER_GRID: &str = r#"// DO NOT EDIT! This test has been generated from a YAML definition.
// OffscreenCanvas test in a worker: {{ name }}

importScripts("/resources/testharness.js");
importScripts("/html/canvas/resources/canvas-tests.js");

{% for variant in variants %}(function() {
  var t = async_test("{{ variant.desc | double_quote_escape }} ({{ variant.grid_variant_name }})");
  t.step(function() {
    var canvas = new OffscreenCanvas({{ variant.size.0 }}, {{ variant.size.1 }});
    var ctx = canvas.getContext('2d');
    {{ variant.code | indent(4) }}
    t.done();
  });
})();
{% endfor %}done();
"#;

const REFTEST_ELEMENT: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
{% if is_test_reference %}{% else %}<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}{% endif %}<body>
<canvas id="c" width="{{ size.0 }}" height="{{ size.1 }}"{{ attributes }}></canvas>
{% for image in images %}<img src="/images/{{ image }}" id="{{ image }}" class="resource">
{% endfor %}<script>
var canvas = document.getElementById("c");
var ctx = canvas.getContext('2d');
{% if is_test_reference %}{{ reference }}{% else %}{{ code }}{% endif %}
document.documentElement.classList.remove("reftest-wait");
</script>
"#;

const REFTEST_ELEMENT_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
{% if is_test_reference %}{% else %}<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}{% endif %}<body style="display: grid; grid-template-columns: repeat({{ grid_width }}, max-content); gap: 4px">
{% for variant in variants %}<canvas id="c{{ variant.id }}" width="{{ variant.size.0 }}" height="{{ variant.size.1 }}"{{ variant.attributes }}></canvas>
{% endfor %}<script>
{% for variant in variants %}(function() {
  var canvas = document.getElementById("c{{ variant.id }}");
  var ctx = canvas.getContext('2d');
  {% if is_test_reference %}{{ variant.reference | indent(2) }}{% else %}{{ variant.code | indent(2) }}{% endif %}
})();
{% endfor %}document.documentElement.classList.remove("reftest-wait");
</script>
"#;

const REFTEST_OFFSCREEN: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>OffscreenCanvas test: {{ name }}</title>
<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}<body>
<canvas id="c" width="{{ size.0 }}" height="{{ size.1 }}"></canvas>
<script>
var canvas = new OffscreenCanvas({{ size.0 }}, {{ size.1 }});
var ctx = canvas.getContext('2d');
{{ code }}
var output = document.getElementById("c");
output.getContext('2d').drawImage(canvas, 0, 0);
document.documentElement.classList.remove("reftest-wait");
</script>
"#;

const REFTEST_OFFSCREEN_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>OffscreenCanvas test: {{ name }}</title>
<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}<body style="display: grid; grid-template-columns: repeat({{ grid_width }}, max-content); gap: 4px">
{% for variant in variants %}<canvas id="c{{ variant.id }}" width="{{ variant.size.0 }}" height="{{ variant.size.1 }}"></canvas>
{% endfor %}<script>
{% for variant in variants %}(function() {
  var canvas = new OffscreenCanvas({{ variant.size.0 }}, {{ variant.size.1 }});
  var ctx = canvas.getContext('2d');
  {{ variant.code | indent(2) }}
  var output = document.getElementById("c{{ variant.id }}");
  output.getContext('2d').drawImage(canvas, 0, 0);
})();
{% endfor %}document.documentElement.classList.remove("reftest-wait");
</script>
"#;

const REFTEST_WORKER: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>OffscreenCanvas test in a worker: {{ name }}</title>
<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}<body>
<canvas id="c" width="{{ size.0 }}" height="{{ size.1 }}"></canvas>
<script>
var code = document.getElementById("code").textContent;
var worker = new Worker(URL.createObjectURL(new Blob([code])));
worker.onmessage = function(event) {
  var output = document.getElementById("c");
  output.getContext('2d').drawImage(event.data, 0, 0);
  document.documentElement.classList.remove("reftest-wait");
};
</script>
<script type="text/plain" id="code">
var canvas = new OffscreenCanvas({{ size.0 }}, {{ size.1 }});
var ctx = canvas.getContext('2d');
{{ code }}
postMessage(canvas.transferToImageBitmap());
</script>
"#;

const REFTEST_WORKER_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This test has been generated from a YAML definition. -->
<html class="reftest-wait">
<meta charset="UTF-8">
<title>OffscreenCanvas test in a worker: {{ name }}</title>
<link rel="match" href="{{ reference_file }}">
{% if fuzzy %}<meta name="fuzzy" content="{{ fuzzy }}">
{% endif %}<body style="display: grid; grid-template-columns: repeat({{ grid_width }}, max-content); gap: 4px">
{% for variant in variants %}<canvas id="c{{ variant.id }}" width="{{ variant.size.0 }}" height="{{ variant.size.1 }}"></canvas>
{% endfor %}<script>
var pending = 0;
function cellDone() {
  if (--pending === 0)
    document.documentElement.classList.remove("reftest-wait");
}
{% for variant in variants %}(function() {
  pending++;
  var code = document.getElementById("code{{ variant.id }}").textContent;
  var worker = new Worker(URL.createObjectURL(new Blob([code])));
  worker.onmessage = function(event) {
    var output = document.getElementById("c{{ variant.id }}");
    output.getContext('2d').drawImage(event.data, 0, 0);
    cellDone();
  };
})();
{% endfor %}</script>
{% for variant in variants %}<script type="text/plain" id="code{{ variant.id }}">
var canvas = new OffscreenCanvas({{ variant.size.0 }}, {{ variant.size.1 }});
var ctx = canvas.getContext('2d');
{{ variant.code }}
postMessage(canvas.transferToImageBitmap());
</script>
{% endfor %}"#;

const REFTEST_HTML: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This reference has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
<body>
{{ html_reference }}
"#;

const REFTEST_HTML_GRID: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This reference has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
<body style="display: grid; grid-template-columns: repeat({{ grid_width }}, max-content); gap: 4px">
{% for variant in variants %}<div>
{{ variant.html_reference | indent(0) }}
</div>
{% endfor %}"#;

const REFTEST_IMG: &str = r#"<!DOCTYPE html>
<!-- DO NOT EDIT! This reference has been generated from a YAML definition. -->
<meta charset="UTF-8">
<title>Canvas test: {{ name }}</title>
<body>
<img src="{{ img_reference }}" alt="">
"#;
