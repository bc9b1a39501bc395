//! Macro expansion for LaTeX input.
//!
//! A [`Session`] holds the state of one conversion: the macros and
//! environments currently defined, labels found in the first pass, and the
//! title and author announced by the document. Packages loaded with
//! `\usepackage` are looked up in a [`PackageRegistry`] owned by the
//! caller.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::util::escape_xml;

/// Name under which verbatim blocks are expanded.
pub const VERBATIM: &str = "%verbatim%";

const HORIZONTAL_ELLIPSIS: &str = "\u{2026}";

/// Callback implementing a macro.
///
/// `args` are the macro's arguments, already converted.
pub type MacroFn = fn(args: &[String], session: &mut Session<'_>) -> String;

/// What a macro expands to.
#[derive(Debug, Clone)]
pub enum Macro {
    /// Expands to nothing.
    Ignore,
    /// Expands to fixed text.
    Subst(String),
    /// Wraps the first argument in an HTML element.
    HtmlTag(String),
    Func(MacroFn),
}

impl Macro {
    pub fn expand(&self, args: &[String], session: &mut Session<'_>) -> String {
        match self {
            Macro::Ignore => String::new(),
            Macro::Subst(text) => text.clone(),
            Macro::HtmlTag(tag) => format!("<{tag}>{}</{tag}>", arg(args, 0)),
            Macro::Func(f) => f(args, session),
        }
    }
}

fn arg(args: &[String], n: usize) -> &str {
    args.get(n).map(String::as_str).unwrap_or_default()
}

/// Macros by name, including the leading backslash.
pub type MacroTable = HashMap<String, Macro>;

/// A numbered environment such as `equation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Word used when referring to the environment, e.g. "Equation".
    pub prefix: String,
    pub counter: String,
    /// Display environment to typeset the body in, if it is maths.
    pub render_math: Option<String>,
}

/// A `\label` recorded in the first pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub label: String,
    pub chapter: u32,
    pub id: String,
    /// Text shown for references, e.g. "1.2" or "Equation 3".
    pub name: String,
}

/// Installs the macros of a package.
pub type PackageInit = fn(session: &mut Session<'_>, options: &str);

/// Packages known to `\usepackage`.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: HashMap<String, PackageInit>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the packages that need no macros of their own.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in ["amsmath", "amssymb", "amsthm"] {
            registry.register(name, no_macros);
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, init: PackageInit) {
        self.packages.insert(name.into(), init);
    }

    pub fn get(&self, name: &str) -> Option<PackageInit> {
        self.packages.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }
}

fn no_macros(_session: &mut Session<'_>, _options: &str) {}

/// State of one conversion.
#[derive(Debug)]
pub struct Session<'r> {
    pub macros: MacroTable,
    pub environments: HashMap<String, Environment>,
    pub counters: HashMap<String, u32>,
    pub labels: Vec<Label>,
    pub title: Option<String>,
    pub author: Option<String>,
    registry: &'r PackageRegistry,
}

impl<'r> Session<'r> {
    /// A session with the built-in macros.
    pub fn new(registry: &'r PackageRegistry) -> Self {
        let mut session = Self {
            macros: MacroTable::new(),
            environments: HashMap::new(),
            counters: HashMap::new(),
            labels: Vec::new(),
            title: None,
            author: None,
            registry,
        };
        session.add_builtin_macros();
        session
    }

    fn add_builtin_macros(&mut self) {
        let builtins = [
            ("\\epubauthor", Macro::Func(epub_author)),
            ("\\epubtitle", Macro::Func(epub_title)),
            (VERBATIM, Macro::Func(verbatim)),
            ("\\documentclass", Macro::Ignore),
            // labels are collected in the first pass
            ("\\label", Macro::Ignore),
            ("\\ref", Macro::Func(reference)),
            ("\\usepackage", Macro::Func(use_package)),
            ("\\verb", Macro::Func(verb)),
            ("\\textit", Macro::HtmlTag("i".to_string())),
            ("\\textbf", Macro::HtmlTag("b".to_string())),
            ("\\dots", Macro::Subst(HORIZONTAL_ELLIPSIS.to_string())),
        ];
        for (name, m) in builtins {
            self.macros.insert(name.to_string(), m);
        }

        self.counters.insert("base@equation".to_string(), 0);
        self.environments.insert(
            "equation".to_string(),
            Environment {
                prefix: "Equation".to_string(),
                counter: "base@equation".to_string(),
                render_math: Some("equation*".to_string()),
            },
        );
    }

    pub fn registry(&self) -> &'r PackageRegistry {
        self.registry
    }

    pub fn define(&mut self, name: impl Into<String>, m: Macro) {
        self.macros.insert(name.into(), m);
    }

    /// Expand the macro `name` with `args`.
    pub fn expand(&mut self, name: &str, args: &[String]) -> Result<String> {
        let m = self
            .macros
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMacro(name.to_string()))?;
        Ok(m.expand(args, self))
    }

    /// Advance `counter` and return its new value.
    pub fn step_counter(&mut self, counter: &str) -> u32 {
        let value = self.counters.entry(counter.to_string()).or_default();
        *value += 1;
        *value
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn find_label(&self, label: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.label == label)
    }
}

fn epub_author(args: &[String], session: &mut Session<'_>) -> String {
    session.author = Some(arg(args, 0).to_string());
    String::new()
}

fn epub_title(args: &[String], session: &mut Session<'_>) -> String {
    session.title = Some(arg(args, 0).to_string());
    String::new()
}

fn verbatim(args: &[String], _session: &mut Session<'_>) -> String {
    format!(
        "<pre class=\"latex-verbatim\">{}\n</pre>\n",
        escape_xml(arg(args, 0))
    )
}

fn verb(args: &[String], _session: &mut Session<'_>) -> String {
    format!("<span class=\"latex-verb\">{}</span>", escape_xml(arg(args, 0)))
}

fn reference(args: &[String], session: &mut Session<'_>) -> String {
    let target = arg(args, 0);
    match session.find_label(target) {
        // chapter files are named after their number
        Some(label) => format!(
            "<a href=\"ch{}.xhtml#{}\">{}</a>",
            label.chapter,
            escape_xml(&label.id),
            label.name
        ),
        None => {
            log::warn!("undefined reference {target:?}");
            format!("<span class=\"error\">{}</span>", escape_xml(target))
        }
    }
}

fn use_package(args: &[String], session: &mut Session<'_>) -> String {
    let options = arg(args, 0);
    let name = arg(args, 1);
    match session.registry().get(name) {
        Some(init) => init(session, options),
        None => log::warn!("unknown package {name:?} (options {options:?})"),
    }
    String::new()
}
