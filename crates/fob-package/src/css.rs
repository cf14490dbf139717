//! Style sheets imported from component modules.
//!
//! A published package is a single JavaScript file, so every `.css` import
//! is compiled into an ES module that appends the processed rules to
//! `document.head` as a `<style>` element.
//!
//! Files ending in `.module.css` are compiled as CSS modules. Class names are
//! scoped per file and the module's default export maps each local name to
//! its scoped class list. Names containing dashes are exported twice, as
//! written and in camelCase (`nav-bar` and `navBar`). Plain style sheets
//! export an empty object.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lightningcss::css_modules::{self, CssModuleExports, CssModuleReference};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
};
use serde_json::Value;

const CSS_EXTENSION: &str = ".css";
const CSS_MODULE_SUFFIX: &str = ".module.css";

#[derive(Debug, thiserror::Error)]
pub enum StyleModuleError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSS in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to print CSS for {path}: {message}")]
    Print { path: String, message: String },
}

pub fn is_style_sheet(path: &str) -> bool {
    path.ends_with(CSS_EXTENSION)
}

pub fn is_css_module(path: &str) -> bool {
    path.ends_with(CSS_MODULE_SUFFIX)
}

/// Compile the CSS `source` read from `path` into an ES module.
///
/// # Arguments
///
/// * `path` - File the source came from. Decides whether CSS module scoping
///   applies and seeds the scoped class names.
/// * `source` - The style sheet text.
/// * `minify` - Minify the rules before embedding them.
///
/// # Examples
///
/// ```rust
/// use fob_package::css::style_module;
///
/// let code = style_module("/ws/card.module.css", ".nav-bar { color: red }", false).unwrap();
/// assert!(code.contains("\"navBar\""));
/// assert!(code.contains("document.createElement(\"style\")"));
/// ```
///
/// # Errors
///
/// Returns [`StyleModuleError::Parse`] for CSS lightningcss rejects and
/// [`StyleModuleError::Print`] if the sheet cannot be printed back.
pub fn style_module(path: &str, source: &str, minify: bool) -> Result<String, StyleModuleError> {
    let parse_error = |message: String| StyleModuleError::Parse {
        path: path.to_string(),
        message,
    };

    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: path.to_string(),
            css_modules: is_css_module(path).then(css_modules::Config::default),
            ..Default::default()
        },
    )
    .map_err(|e| parse_error(e.to_string()))?;

    if minify {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| parse_error(e.to_string()))?;
    }

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..Default::default()
        })
        .map_err(|e| StyleModuleError::Print {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let locals = printed.exports.map(class_map).unwrap_or_default();
    Ok(render(&printed.code, &locals))
}

/// Rewrite every `.css` file directly inside `dir` into its ES module form.
///
/// Used where the bundler cannot run [`InlineStylePlugin`]; the bundler must
/// then load `.css` files as JavaScript. Returns how many files were rewritten.
pub async fn inline_style_sheets(dir: &Path, minify: bool) -> Result<usize, StyleModuleError> {
    let read_error = |source| StyleModuleError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut rewritten = 0;
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let name = path.to_string_lossy().into_owned();
        let is_file = entry.file_type().await.is_ok_and(|kind| kind.is_file());
        if !is_file || !is_style_sheet(&name) {
            continue;
        }

        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| StyleModuleError::Read {
                path: path.clone(),
                source,
            })?;
        let code = style_module(&name, &source, minify)?;
        tokio::fs::write(&path, code)
            .await
            .map_err(|source| StyleModuleError::Write {
                path: path.clone(),
                source,
            })?;
        rewritten += 1;
    }
    Ok(rewritten)
}

fn class_map(exports: CssModuleExports) -> BTreeMap<String, String> {
    let mut locals = BTreeMap::new();
    for (local, export) in exports {
        let mut classes = vec![export.name];
        classes.extend(export.composes.into_iter().filter_map(|reference| match reference {
            CssModuleReference::Local { name } | CssModuleReference::Global { name } => Some(name),
            CssModuleReference::Dependency { .. } => None,
        }));
        let classes = classes.join(" ");

        if local.contains('-') {
            locals.insert(dashes_to_camel_case(&local), classes.clone());
        }
        locals.insert(local, classes);
    }
    locals
}

/// `nav-bar` -> `navBar`. Only dashes are folded; underscores stay.
fn dashes_to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn render(css: &str, locals: &BTreeMap<String, String>) -> String {
    let css = Value::from(css);
    let locals = Value::Object(
        locals
            .iter()
            .map(|(local, classes)| (local.clone(), Value::from(classes.as_str())))
            .collect(),
    );

    format!(
        "const css = {css};\n\
         if (typeof document !== \"undefined\") {{\n\
         \x20 const style = document.createElement(\"style\");\n\
         \x20 style.textContent = css;\n\
         \x20 document.head.appendChild(style);\n\
         }}\n\
         export default {locals};\n"
    )
}

/// Rolldown load hook that serves `.css` imports as style-injecting modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStylePlugin {
    minify: bool,
}

impl InlineStylePlugin {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }
}

impl Plugin for InlineStylePlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-package-inline-css".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let minify = self.minify;

        async move {
            if !is_style_sheet(&id) {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .map_err(|source| StyleModuleError::Read {
                    path: PathBuf::from(&id),
                    source,
                })?;
            let code = style_module(&id, &source, minify)?;
            tracing::debug!(path = %id, css_module = is_css_module(&id), "inlined style sheet");

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_export(code: &str) -> serde_json::Map<String, Value> {
        let json = code
            .split("export default ")
            .nth(1)
            .and_then(|rest| rest.trim().strip_suffix(';'))
            .unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_plugin_name() {
        assert_eq!(InlineStylePlugin::new(true).name(), "fob-package-inline-css");
    }

    #[test]
    fn test_plain_style_sheet_is_injected() {
        let code = style_module("/ws/style.css", ":root { --primary: #123456; }", false).unwrap();

        assert!(code.contains("--primary"));
        assert!(code.contains("#123456"));
        assert!(code.contains("document.head.appendChild(style)"));
        assert!(default_export(&code).is_empty());
    }

    #[test]
    fn test_css_module_exports_dashed_and_camel_case_names() {
        let code = style_module(
            "/ws/card.module.css",
            ".nav-bar { color: red; } .title_text { margin: 0; }",
            false,
        )
        .unwrap();
        let locals = default_export(&code);

        let scoped = locals["nav-bar"].as_str().unwrap();
        assert_ne!(scoped, "nav-bar");
        assert!(scoped.contains("nav-bar"));
        assert_eq!(locals["navBar"], locals["nav-bar"]);
        assert!(locals.contains_key("title_text"));
        assert!(!locals.contains_key("titleText"));
        assert!(code.contains(scoped), "rules should use the scoped class");
    }

    #[test]
    fn test_minified_output() {
        let code = style_module("/ws/style.css", "a {\n  color: red;\n}\n", true).unwrap();
        assert!(code.contains("a{color:red}"));
    }

    #[test]
    fn test_dashes_to_camel_case() {
        assert_eq!(dashes_to_camel_case("nav-bar"), "navBar");
        assert_eq!(dashes_to_camel_case("a-b-c"), "aBC");
        assert_eq!(dashes_to_camel_case("plain"), "plain");
        assert_eq!(dashes_to_camel_case("snake_case"), "snake_case");
    }

    #[tokio::test]
    async fn test_inline_style_sheets_rewrites_only_css() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("style.css"), "a { color: red; }").unwrap();
        std::fs::write(temp.path().join("home.jsx"), "import './style.css';").unwrap();

        let rewritten = inline_style_sheets(temp.path(), false).await.unwrap();

        assert_eq!(rewritten, 1);
        let css = std::fs::read_to_string(temp.path().join("style.css")).unwrap();
        assert!(css.starts_with("const css = "));
        let jsx = std::fs::read_to_string(temp.path().join("home.jsx")).unwrap();
        assert_eq!(jsx, "import './style.css';");
    }
}
