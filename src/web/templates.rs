// HTML pages rendered with minijinja (auto-escaping is on for *.html templates).
// Escaping turns `/` into an entity, so URL prefixes live in the templates and
// only sanitized file names are interpolated.

use minijinja::Environment;
use serde::Serialize;

use super::error::AppError;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Image Upscaler</title>
<style>
body { font-family: sans-serif; max-width: 640px; margin: 40px auto; }
label { display: block; margin-top: 12px; }
button { margin-top: 16px; }
</style>
</head>
<body>
<h2>Upload an image to upscale</h2>
<form action="/upload" method="post" enctype="multipart/form-data">
  <label>Image <input type="file" name="image" accept="image/*" required></label>
  <label>Model
    <select name="model">
    {%- for model in models %}
      <option value="{{ model.id }}"{% if model.id == default_model %} selected{% endif %}>{{ model.label }}</option>
    {%- endfor %}
    </select>
  </label>
  <label>Resolution
    <select name="resolution">
    {%- for factor in resolutions %}
      <option value="{{ factor }}"{% if loop.last %} selected{% endif %}>x{{ factor }}</option>
    {%- endfor %}
    </select>
  </label>
  <button type="submit">Upscale</button>
</form>
</body>
</html>
"#;

const RESULT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Upscaled Result</title>
<style>
body { font-family: sans-serif; margin: 40px; }
.pair { display: flex; gap: 24px; flex-wrap: wrap; }
figure { margin: 0; }
img { max-width: 500px; border: 1px solid #ccc; }
</style>
</head>
<body>
<h2>Upscaled Result</h2>
{%- if model_label %}
<p>Model: {{ model_label }}{% if resolution %}, x{{ resolution }}{% endif %}</p>
{%- endif %}
<div class="pair">
{%- if original %}
  <figure>
    <figcaption>Original: {{ original.name }}</figcaption>
    <img src="/static/uploads/{{ original.name }}" alt="original">
    <p>{{ original.size_label }}{% if original.dimensions %} &middot; {{ original.dimensions }}{% endif %}</p>
  </figure>
{%- endif %}
  <figure>
    <figcaption>Upscaled: {{ output.name }}</figcaption>
    <img src="/static/outputs/{{ output.name }}" alt="upscaled">
    <p>{{ output.size_label }}{% if output.dimensions %} &middot; {{ output.dimensions }}{% endif %}</p>
  </figure>
</div>
<p><a href="/download/{{ output.name }}">Download</a> | <a href="/">Upload Another</a></p>
<script>
(function () {
  var sent = false;
  function cleanup() {
    if (sent) { return; }
    sent = true;
    navigator.sendBeacon('/cleanup');
  }
  window.addEventListener('pagehide', cleanup);
  window.addEventListener('beforeunload', cleanup);
})();
</script>
</body>
</html>
"#;

const NOT_FOUND_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Output not found</title></head>
<body>
<h2>Error: Output file not found</h2>
<p>Could not find {{ filename }} in output folder.</p>
<p>Available files: {% if available %}{{ available | join(", ") }}{% else %}None{% endif %}</p>
<br><a href="/">Upload Another</a>
</body>
</html>
"#;

/// Compiled page templates.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_HTML)?;
        env.add_template("result.html", RESULT_HTML)?;
        env.add_template("not_found.html", NOT_FOUND_HTML)?;
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, AppError> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}
