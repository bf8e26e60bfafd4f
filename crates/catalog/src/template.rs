//! DDL templates with `#name#` placeholders.
//!
//! Templates are rendered with minijinja using `#` as the variable
//! delimiter. Tokens outside [`Placeholder`] are rejected at parse time and
//! unbound ones fail the render (strict undefined behaviour), so a rendered
//! statement never carries a leftover placeholder.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};

/// Template file defining the external snapshot table.
pub const TABLE_TEMPLATE_FILE: &str = "template-table.sql";

/// Template file defining the view over the snapshot table.
pub const VIEW_TEMPLATE_FILE: &str = "template-view.sql";

const BUNDLED_TABLE: &str = include_str!("../templates/template-table.sql");
const BUNDLED_VIEW: &str = include_str!("../templates/template-view.sql");

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{template}' uses unknown placeholder #{token}#")]
    UnknownPlaceholder { template: String, token: String },

    #[error("template '{template}' left #{placeholder}# unresolved")]
    Unresolved {
        template: String,
        placeholder: Placeholder,
    },

    #[error("template '{template}' is invalid: {source}")]
    Syntax {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("template '{template}' failed to render: {source}")]
    Render {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The closed set of substitution points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    Service,
    Resource,
    Bucket,
    Prefix,
    Fields,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Service,
        Placeholder::Resource,
        Placeholder::Bucket,
        Placeholder::Prefix,
        Placeholder::Fields,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Resource => "resource",
            Self::Bucket => "bucket",
            Self::Prefix => "prefix",
            Self::Fields => "fields",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Values bound to placeholders for one render.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    values: BTreeMap<Placeholder, String>,
}

impl TemplateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    /// Bound values keyed by token, the render context.
    fn context(&self) -> BTreeMap<&'static str, &str> {
        self.values
            .iter()
            .map(|(placeholder, value)| (placeholder.token(), value.as_str()))
            .collect()
    }
}

/// A parsed DDL template.
#[derive(Debug, Clone)]
pub struct DdlTemplate {
    name: String,
    source: String,
    placeholders: BTreeSet<Placeholder>,
}

/// Environment for DDL text: `#name#` variables, no escaping, strict undefined.
fn build_env<'source>() -> Result<Environment<'source>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_syntax(SyntaxConfig::builder().variable_delimiters("#", "#").build()?);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_keep_trailing_newline(true);
    Ok(env)
}

impl DdlTemplate {
    /// Parse `text`, rejecting syntax errors and tokens outside [`Placeholder`].
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let syntax_error = |source: minijinja::Error| TemplateError::Syntax {
            template: name.clone(),
            source,
        };

        let mut tokens: Vec<String> = {
            let env = build_env().map_err(syntax_error)?;
            let template = env
                .template_from_named_str(&name, text)
                .map_err(syntax_error)?;
            template.undeclared_variables(false).into_iter().collect()
        };
        tokens.sort();

        let mut placeholders = BTreeSet::new();
        for token in tokens {
            match Placeholder::from_token(&token) {
                Some(placeholder) => {
                    placeholders.insert(placeholder);
                }
                None => {
                    return Err(TemplateError::UnknownPlaceholder {
                        template: name,
                        token,
                    })
                }
            }
        }

        Ok(Self {
            name,
            source: text.to_string(),
            placeholders,
        })
    }

    /// Read and parse a template file; the file name becomes the template name.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute every placeholder; any unbound one is an error.
    pub fn render(&self, params: &TemplateParams) -> Result<String, TemplateError> {
        let env = build_env().map_err(|source| self.render_error(source))?;
        env.render_named_str(&self.name, &self.source, params.context())
            .map_err(|source| match source.kind() {
                ErrorKind::UndefinedError => self
                    .placeholders
                    .iter()
                    .find(|p| params.get(**p).is_none())
                    .map(|placeholder| TemplateError::Unresolved {
                        template: self.name.clone(),
                        placeholder: *placeholder,
                    })
                    .unwrap_or_else(|| self.render_error(source)),
                _ => self.render_error(source),
            })
    }

    fn render_error(&self, source: minijinja::Error) -> TemplateError {
        TemplateError::Render {
            template: self.name.clone(),
            source,
        }
    }
}

/// The table and view templates, rendered in that order for each new table.
#[derive(Debug, Clone)]
pub struct DdlTemplates {
    pub table: DdlTemplate,
    pub view: DdlTemplate,
}

impl DdlTemplates {
    /// Templates shipped with the crate.
    pub fn bundled() -> Result<Self, TemplateError> {
        Ok(Self {
            table: DdlTemplate::parse(TABLE_TEMPLATE_FILE, BUNDLED_TABLE)?,
            view: DdlTemplate::parse(VIEW_TEMPLATE_FILE, BUNDLED_VIEW)?,
        })
    }

    /// `template-table.sql` and `template-view.sql` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, TemplateError> {
        Ok(Self {
            table: DdlTemplate::load(&dir.join(TABLE_TEMPLATE_FILE))?,
            view: DdlTemplate::load(&dir.join(VIEW_TEMPLATE_FILE))?,
        })
    }

    /// Render both templates, table first.
    pub fn render(&self, params: &TemplateParams) -> Result<[String; 2], TemplateError> {
        Ok([self.table.render(params)?, self.view.render(params)?])
    }
}
