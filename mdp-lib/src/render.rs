//! Turns Markdown into a sanitized HTML fragment and wraps it in a page template.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::MdpError;

/// Title bound into every rendered page.
pub const PAGE_TITLE: &str = "Markdown Preview Tool";

/// Built-in page template. Templates see `title`, `body` and `filename`.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>{{ title }}</title>
  </head>
  <body>
  File name: {{ filename }}
{{ body }}
  </body>
</html>
"#;

const INLINE_TEMPLATE_NAME: &str = "mdp";

/// The template text used when no template file is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultTemplate(String);

impl DefaultTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Uses `text` when it is present and non-empty, the built-in template otherwise.
    pub fn from_override(text: Option<String>) -> Self {
        match text {
            Some(text) if !text.is_empty() => Self(text),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DefaultTemplate {
    fn default() -> Self {
        Self(DEFAULT_TEMPLATE.to_string())
    }
}

/// Where the page template comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource<'a> {
    File(&'a Path),
    Inline(&'a str),
}

impl<'a> TemplateSource<'a> {
    /// A custom template file wins over the default template text.
    pub fn select(custom: Option<&'a Path>, default: &'a DefaultTemplate) -> Self {
        match custom {
            Some(path) => Self::File(path),
            None => Self::Inline(default.as_str()),
        }
    }
}

/// Values bound into the page template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    pub title: String,
    pub body: String,
    pub filename: String,
}

impl RenderContext {
    /// `body` must already be sanitized; it is bound verbatim. The title and
    /// the file name are escaped here.
    pub fn new(body: String, rendered_path: &Path) -> Self {
        Self {
            title: html_escape::encode_quoted_attribute(PAGE_TITLE).into_owned(),
            body,
            filename: html_escape::encode_quoted_attribute(&rendered_path.display().to_string())
                .into_owned(),
        }
    }
}

/// A compiled page template.
#[derive(Debug)]
pub struct PageTemplate {
    tera: Tera,
    name: String,
}

impl PageTemplate {
    /// Reads (for file sources) and compiles the template.
    pub fn load(source: &TemplateSource<'_>) -> Result<Self, MdpError> {
        match *source {
            TemplateSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| MdpError::TemplateRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::compile(&path.display().to_string(), &text)
            }
            TemplateSource::Inline(text) => Self::compile(INLINE_TEMPLATE_NAME, text),
        }
    }

    pub fn compile(name: &str, text: &str) -> Result<Self, MdpError> {
        let mut tera = Tera::default();
        // Escaping is done when the context is built.
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(name, text)
            .map_err(|source| MdpError::Template {
                name: name.to_string(),
                source,
            })?;

        Ok(Self {
            tera,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes the template. Unknown variables are errors.
    pub fn render(&self, context: &RenderContext) -> Result<String, MdpError> {
        let context = Context::from_serialize(context).map_err(|source| self.error(source))?;
        self.tera
            .render(&self.name, &context)
            .map_err(|source| self.error(source))
    }

    fn error(&self, source: tera::Error) -> MdpError {
        MdpError::Template {
            name: self.name.clone(),
            source,
        }
    }
}

/// Converts CommonMark (with tables, strikethrough and footnotes) into raw HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(markdown, options);

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

/// Strips scripts, event handlers, unsafe URLs and unknown elements while
/// keeping common rich-text markup.
pub fn sanitize(html: &str) -> String {
    ugc_policy().clean(html).to_string()
}

/// Markdown bytes to a sanitized HTML fragment. Invalid UTF-8 is replaced.
pub fn render_fragment(markdown: &[u8]) -> String {
    let markdown = String::from_utf8_lossy(markdown);
    sanitize(&markdown_to_html(&markdown))
}

fn ugc_policy() -> Builder<'static> {
    let mut policy = Builder::default();
    policy
        .link_rel(Some("nofollow noopener noreferrer"))
        .add_tag_attributes("code", &["class"])
        .attribute_filter(keep_language_classes);
    policy
}

// Fenced code blocks carry `class="language-xxx"`; no other class survives.
fn keep_language_classes<'u>(
    element: &str,
    attribute: &str,
    value: &'u str,
) -> Option<Cow<'u, str>> {
    match (element, attribute) {
        ("code", "class") => value
            .split_whitespace()
            .all(|class| class.starts_with("language-"))
            .then_some(Cow::Borrowed(value)),
        _ => Some(Cow::Borrowed(value)),
    }
}
