use std::fmt;

use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;

/// How an element is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector; class fragments go through `[class*='…']`.
    Css(&'static str),
    /// A `tag` element whose own text equals `text`.
    Text { tag: &'static str, text: &'static str },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "'{}'", css),
            Locator::Text { tag, text } => write!(f, "<{}> '{}'", tag, text),
        }
    }
}

/// What is read off a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Rendered text: whitespace runs become one space, block elements and
    /// `<br>` start a new line.
    Text,
    Attr(&'static str),
}

/// Restricts a query to the `index`-th (0-based) match of `locator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nth {
    pub locator: Locator,
    pub index: usize,
}

impl fmt::Display for Nth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.locator, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub within: Option<Nth>,
    pub locator: Locator,
    pub target: Target,
}

impl Query {
    pub fn text(locator: Locator) -> Self {
        Self { within: None, locator, target: Target::Text }
    }

    pub fn attr(locator: Locator, attr: &'static str) -> Self {
        Self { within: None, locator, target: Target::Attr(attr) }
    }

    pub fn within(mut self, locator: Locator, index: usize) -> Self {
        self.within = Some(Nth { locator, index });
        self
    }
}

/// One cell read inside a row element: first match of `locator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub locator: Locator,
    pub target: Target,
}

/// Query capability a field rule runs against.
///
/// Reads never change what a later read returns. The two `&mut` methods
/// stand for navigation side effects (scrolling a lazy block into view,
/// clicking a disclosure toggle); they may alter visibility, never text.
pub trait Document {
    fn url(&self) -> &str;

    /// Target of every element matched by `query`, in document order.
    fn read_all(&self, query: &Query) -> Result<Vec<String>, ExtractError>;

    /// For each element matched by `rows`, one value per probe.
    fn read_rows(&self, rows: &Locator, cells: &[Probe]) -> Result<Vec<Vec<String>>, ExtractError>;

    fn scroll_into_view(&mut self, locator: &Locator) -> Result<(), ExtractError>;

    /// Activates the `handle` element inside every `rows` match.
    fn activate_each(&mut self, rows: &Locator, handle: &Locator) -> Result<(), ExtractError>;
}

/// A fetched page parsed into a static markup tree.
///
/// Lazy blocks and collapsed answers are already in the markup, so scrolling
/// and activation only check that their target exists.
pub struct HtmlDocument {
    url: String,
    html: Html,
}

impl HtmlDocument {
    pub fn parse(url: impl Into<String>, markup: &str) -> Self {
        Self {
            url: url.into(),
            html: Html::parse_document(markup),
        }
    }
}

impl Document for HtmlDocument {
    fn url(&self) -> &str {
        &self.url
    }

    fn read_all(&self, query: &Query) -> Result<Vec<String>, ExtractError> {
        let root = self.html.root_element();
        let scope = match &query.within {
            Some(nth) => find(root, &nth.locator)?
                .into_iter()
                .nth(nth.index)
                .ok_or_else(|| ExtractError::NotFound(nth.to_string()))?,
            None => root,
        };

        find(scope, &query.locator)?
            .into_iter()
            .map(|el| read(el, &query.locator, query.target))
            .collect()
    }

    fn read_rows(&self, rows: &Locator, cells: &[Probe]) -> Result<Vec<Vec<String>>, ExtractError> {
        let mut out = Vec::new();
        for row in find(self.html.root_element(), rows)? {
            let mut values = Vec::with_capacity(cells.len());
            for probe in cells {
                let el = find(row, &probe.locator)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ExtractError::NotFound(format!("{} in {}", probe.locator, rows)))?;
                values.push(read(el, &probe.locator, probe.target)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    fn scroll_into_view(&mut self, locator: &Locator) -> Result<(), ExtractError> {
        if find(self.html.root_element(), locator)?.is_empty() {
            return Err(ExtractError::NotFound(locator.to_string()));
        }
        Ok(())
    }

    fn activate_each(&mut self, rows: &Locator, handle: &Locator) -> Result<(), ExtractError> {
        for row in find(self.html.root_element(), rows)? {
            if find(row, handle)?.is_empty() {
                return Err(ExtractError::NotFound(format!("{} in {}", handle, rows)));
            }
        }
        Ok(())
    }
}

fn find<'a>(scope: ElementRef<'a>, locator: &Locator) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    match locator {
        Locator::Css(css) => {
            let selector = parse_selector(css)?;
            Ok(scope.select(&selector).collect())
        }
        Locator::Text { tag, text } => {
            let selector = parse_selector(tag)?;
            Ok(scope
                .select(&selector)
                .filter(|el| own_text(*el) == *text)
                .collect())
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css.to_string()))
}

fn read(el: ElementRef<'_>, locator: &Locator, target: Target) -> Result<String, ExtractError> {
    match target {
        Target::Text => Ok(rendered_text(el)),
        Target::Attr(attr) => el
            .value()
            .attr(attr)
            .map(str::to_string)
            .ok_or_else(|| ExtractError::MissingAttribute {
                locator: locator.to_string(),
                attr: attr.to_string(),
            }),
    }
}

/// Direct text children only, like XPath `text()`.
fn own_text(el: ElementRef<'_>) -> String {
    collapse(el.children().filter_map(|c| c.value().as_text()).map(|t| &**t))
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "tr", "ul",
];

fn rendered_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_rendered(el, &mut raw);
    raw.lines()
        .map(|line| collapse(std::iter::once(line)))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_rendered(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            push_rendered(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}

/// Runs of whitespace become one space.
fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
