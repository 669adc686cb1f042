//! README discovery and parsing for module directories.
//!
//! Each module directory may carry a `README.md` or `README.adoc`. The parser
//! extracts a title and description from the first two heading blocks, honors
//! an HTML-comment front-matter preamble, and strips markup through an
//! ordered, dialect-specific regex pipeline. All derived observers memoize
//! their result; a [`ModuleDoc`] is immutable apart from those cache fills.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::Result;

/// Supported README dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// `README.md`
    Markdown,
    /// `README.adoc`
    AsciiDoc,
}

/// The first H1 and H2 blocks of a document.
///
/// A block holds the heading text as its first line, followed by the lines up
/// to the next heading.
#[derive(Debug, Clone, Default)]
struct TagBlocks {
    h1: Vec<String>,
    h2: Vec<String>,
}

/// Parsed documentation for one module directory.
///
/// An empty document (no README found) is valid and yields empty title,
/// description, and content.
#[derive(Debug, Clone, Default)]
pub struct ModuleDoc {
    content: String,
    kind: Option<DocKind>,
    body: OnceCell<String>,
    front_matter: OnceCell<HashMap<String, String>>,
    tags: OnceCell<TagBlocks>,
    title: OnceCell<String>,
    description: OnceCell<String>,
    cleaned: OnceCell<String>,
}

/// Locate and read the README for `dir`.
///
/// The directory is read non-recursively. `README.md` wins over `README.adoc`
/// when both exist (file names are matched case-insensitively). A missing
/// README yields an empty document rather than an error.
pub fn find_doc(dir: &Path) -> Result<ModuleDoc> {
    let mut markdown = None;
    let mut asciidoc = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name == "readme.md" {
            markdown = Some(entry.path());
        } else if name == "readme.adoc" {
            asciidoc = Some(entry.path());
        }
    }

    let (path, kind) = match (markdown, asciidoc) {
        (Some(path), _) => (path, DocKind::Markdown),
        (None, Some(path)) => (path, DocKind::AsciiDoc),
        (None, None) => return Ok(ModuleDoc::default()),
    };
    let content = fs::read_to_string(&path)?;
    Ok(ModuleDoc::new(content, kind))
}

static FRONT_MATTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\A\s*<!--\s*frontmatter\s*\r?\n(.*?)-->").expect("valid front-matter regex")
});

static COLLAPSE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

fn strip_rules(pairs: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    pairs
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid strip pattern"),
                *replacement,
            )
        })
        .collect()
}

/// Ordered markdown strip pipeline. Order is significant: fences before
/// inline code, images before links.
static MARKDOWN_STRIP_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    strip_rules(&[
        (r"(?s)```.*?```", " "),                 // fenced code blocks
        (r"`([^`]*)`", "$1"),                    // inline code
        (r"!\[[^\]]*\]\([^)]*\)", " "),          // images
        (r"\[([^\]]*)\]\([^)]*\)", "$1"),        // links, keep the text
        (r"(?m)^\s*\[[^\]^]+\]:\s*\S.*$", " "),  // reference-link definitions
        (r"\[\^[^\]]*\]", ""),                   // footnote references
        (r"<[^>]+>", " "),                       // html tags
        (r"\*{1,3}([^*\n]+)\*{1,3}", "$1"),      // bold/italic (asterisks)
        (r"__([^_\n]+)__", "$1"),                // bold (underscores)
        (r"(^|\s)_([^_\n]+)_($|\s)", "$1$2$3"),  // italic (underscores)
        (r"(?m)^\s*(?:=+|-+)\s*$", " "),         // setext underlines
        (r"(?m)^\s*>\s?", ""),                   // blockquote markers
        (r"(?m)^\s*#{1,6}\s+", ""),              // residual heading markers
    ])
});

/// Ordered AsciiDoc strip pipeline.
static ASCIIDOC_STRIP_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    strip_rules(&[
        (r"(?m)^//.*$", " "),                             // comment lines
        (r"(?s)ifn?def::.*?endif::\[\]", " "),            // conditional blocks
        (r"(?m)^:[^:\s]+:.*$", " "),                      // attribute definitions
        (r"(?m)^[A-Za-z0-9_-]+::[^\[\]\s]*\[[^\]]*\]\s*$", " "), // block macros (toc::[] ...)
        (r"image:{1,2}[^\[\]\s]*\[[^\]]*\]", " "),        // image macros
        (r"link:[^\[\s]+\[([^\]]*)\]", "$1"),             // link macros, keep the text
        (r"https?://[^\[\s]+\[([^\]]*)\]", "$1"),         // bare-url links with text
        (r"(?m)^(?:-{4,}|\.{4,}|={4,}|\*{4,})\s*$", " "), // block delimiters
        (r"`([^`]*)`", "$1"),                             // inline code
        (r"\*([^*\n]+)\*", "$1"),                         // bold
        (r"(^|\s)_([^_\n]+)_($|\s)", "$1$2$3"),           // italic
        (r"(?m)^={1,6}\s+", ""),                          // residual heading markers
    ])
});

fn strip_markup(text: &str, kind: Option<DocKind>) -> String {
    let rules = match kind {
        Some(DocKind::AsciiDoc) => &*ASCIIDOC_STRIP_RULES,
        _ => &*MARKDOWN_STRIP_RULES,
    };
    let mut cleaned = text.to_string();
    for (pattern, replacement) in rules {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }
    COLLAPSE_WHITESPACE
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

/// Returns the heading level and text when `line` is a heading of `kind`.
fn heading_level(line: &str, kind: DocKind) -> Option<(usize, &str)> {
    let marker = match kind {
        DocKind::Markdown => '#',
        DocKind::AsciiDoc => '=',
    };
    let level = line.chars().take_while(|&c| c == marker).count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level, rest.trim()))
}

/// Collect the first H1 and H2 blocks of `content`.
///
/// A block runs from its heading to the next heading of any level or the end
/// of the file, so the two blocks never overlap.
fn extract_tag_blocks(content: &str, kind: DocKind) -> TagBlocks {
    enum Open {
        None,
        H1,
        H2,
    }

    let mut blocks = TagBlocks::default();
    let mut open = Open::None;
    let mut seen_h1 = false;
    let mut seen_h2 = false;
    for line in content.lines() {
        if let Some((level, text)) = heading_level(line, kind) {
            open = Open::None;
            if level == 1 && !seen_h1 {
                seen_h1 = true;
                open = Open::H1;
                blocks.h1.push(text.to_string());
            } else if level == 2 && !seen_h2 {
                seen_h2 = true;
                open = Open::H2;
                blocks.h2.push(text.to_string());
            }
            continue;
        }
        match open {
            Open::H1 => blocks.h1.push(line.to_string()),
            Open::H2 => blocks.h2.push(line.to_string()),
            Open::None => {},
        }
    }
    blocks
}

/// Accumulate whole sentences until the next one would exceed `max_len`
/// characters, then close with a terminating period.
///
/// A `max_len` of zero disables truncation. A first sentence that alone
/// exceeds the budget is still emitted.
fn truncate_sentences(text: &str, max_len: usize) -> String {
    if max_len == 0 || text.len() <= max_len {
        return text.to_string();
    }
    let mut result = String::new();
    for sentence in text.split('.') {
        if sentence.trim().is_empty() {
            continue;
        }
        if !result.is_empty() && result.len() + sentence.len() + 1 > max_len {
            break;
        }
        result.push_str(sentence);
        result.push('.');
    }
    result
}

impl ModuleDoc {
    /// Wrap raw README content of the given dialect.
    #[must_use]
    pub fn new(content: String, kind: DocKind) -> Self {
        Self {
            content,
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Whether this document was constructed without a README.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    /// The README dialect, if any README was found.
    #[must_use]
    pub fn kind(&self) -> Option<DocKind> {
        self.kind
    }

    /// Document content with the front-matter preamble removed.
    fn body(&self) -> &str {
        self.body
            .get_or_init(|| FRONT_MATTER.replace(&self.content, "").into_owned())
    }

    fn front_matter(&self) -> &HashMap<String, String> {
        self.front_matter.get_or_init(|| {
            let mut pairs = HashMap::new();
            if let Some(caps) = FRONT_MATTER.captures(&self.content) {
                for line in caps[1].lines() {
                    if let Some((key, value)) = line.split_once(':') {
                        let key = key.trim().to_lowercase();
                        if key == "name" || key == "description" {
                            pairs.insert(key, value.trim().to_string());
                        }
                    }
                }
            }
            pairs
        })
    }

    fn front_matter_value(&self, key: &str) -> Option<&str> {
        self.front_matter()
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn tag_blocks(&self) -> &TagBlocks {
        self.tags.get_or_init(|| match self.kind {
            Some(kind) => extract_tag_blocks(self.body(), kind),
            None => TagBlocks::default(),
        })
    }

    /// Document title: front-matter `name`, falling back to the first H1
    /// heading, falling back to the empty string.
    pub fn title(&self) -> &str {
        self.title.get_or_init(|| {
            if let Some(name) = self.front_matter_value("name") {
                return name.to_string();
            }
            self.tag_blocks()
                .h1
                .first()
                .map(|line| line.trim().to_string())
                .unwrap_or_default()
        })
    }

    /// Document description, truncated to whole sentences within `max_len`
    /// characters (zero disables truncation).
    ///
    /// Front-matter `description` wins; otherwise the text of the first H1
    /// block (minus its heading) joined with the first H2 block (minus its
    /// heading) is stripped of markup.
    pub fn description(&self, max_len: usize) -> String {
        let full = self.description.get_or_init(|| {
            if let Some(value) = self.front_matter_value("description") {
                return value.to_string();
            }
            let tags = self.tag_blocks();
            let h1_rest = tags.h1.iter().skip(1).cloned().collect::<Vec<_>>().join("\n");
            let h2_rest = tags.h2.iter().skip(1).cloned().collect::<Vec<_>>().join("\n");
            let mut raw = h1_rest;
            if !h2_rest.is_empty() {
                if !raw.is_empty() {
                    raw.push(' ');
                }
                raw.push_str(&h2_rest);
            }
            strip_markup(&raw, self.kind)
        });
        truncate_sentences(full, max_len)
    }

    /// Document content without front-matter, optionally stripped of markup.
    pub fn content(&self, strip: bool) -> &str {
        if strip {
            self.cleaned
                .get_or_init(|| strip_markup(self.body(), self.kind))
        } else {
            self.body()
        }
    }
}
