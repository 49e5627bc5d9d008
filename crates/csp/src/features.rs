//! Content feature extraction
//!
//! Scans raw document text for the signals that drive policy synthesis:
//! scripts and their dynamic-code markers, forms, and the images,
//! stylesheets and fonts a page pulls in. Matching is heuristic and
//! pattern based; malformed markup simply yields fewer features.

use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;

/// Compiled detection patterns shared by every extractor
struct PatternSet {
    script_tag: Regex,
    inline_script: Regex,
    eval_call: Regex,
    document_write: Regex,
    event_handler: Regex,
    form_tag: Regex,
    img_src: Regex,
    /// `<link>` stylesheet patterns: rel before href, then href before rel
    stylesheet_hrefs: [Regex; 2],
    font_href: Regex,
}

impl PatternSet {
    fn compile() -> Self {
        Self {
            script_tag: pattern(r"(?i)<script[^>]*>"),
            inline_script: pattern(r"(?i)<script[^>]*>[^<]+</script>"),
            eval_call: pattern(r"(?i)eval\s*\("),
            document_write: pattern(r"(?i)document\.write"),
            event_handler: pattern(r"(?i)on\w+\s*="),
            form_tag: pattern(r"(?i)<form"),
            img_src: pattern(r#"(?i)<img[^>]*src=["']([^"']+)["']"#),
            stylesheet_hrefs: [
                pattern(r#"(?i)<link[^>]*rel=["']stylesheet["'][^>]*href=["']([^"']+)["']"#),
                pattern(r#"(?i)<link[^>]*href=["']([^"']+)["'][^>]*rel=["']stylesheet["']"#),
            ],
            font_href: pattern(r#"(?i)<link[^>]*href=["']([^"']*\.woff2?)["']"#),
        }
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in detection pattern must compile")
}

lazy_static::lazy_static! {
    static ref PATTERNS: PatternSet = PatternSet::compile();
}

/// Security-relevant features of one document.
///
/// Produced fresh by every analysis and never mutated afterwards. Source
/// sets hold the matched attribute values verbatim and iterate in
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentFeatures {
    /// A `<script>` opening tag is present
    pub has_script: bool,
    /// A script tag carries a literal body
    pub has_inline_script: bool,
    /// `eval(` or `document.write` appears
    pub has_eval: bool,
    /// An inline `on<event>=` handler attribute appears
    pub has_event_handlers: bool,
    /// A `<form>` element is present
    pub has_form: bool,
    /// `src` values of image elements
    pub img_sources: BTreeSet<String>,
    /// `href` values of stylesheet links
    pub style_sources: BTreeSet<String>,
    /// `href` values of links to `.woff`/`.woff2` files
    pub font_sources: BTreeSet<String>,
}

impl ContentFeatures {
    /// Whether the document shows any sign of inline or dynamic code execution
    pub fn allows_dynamic_code(&self) -> bool {
        self.has_inline_script || self.has_eval || self.has_event_handlers
    }

    /// Whether the document references any image, stylesheet or font
    pub fn has_external_assets(&self) -> bool {
        !self.img_sources.is_empty() || !self.style_sources.is_empty() || !self.font_sources.is_empty()
    }
}

/// Pattern-based feature extractor.
///
/// Holds no per-analysis state, so one extractor can serve any number of
/// concurrent analyses.
#[derive(Clone, Copy)]
pub struct FeatureExtractor {
    patterns: &'static PatternSet,
}

impl FeatureExtractor {
    /// Create an extractor backed by the shared compiled patterns
    pub fn new() -> Self {
        Self { patterns: &PATTERNS }
    }

    /// Scan `content` and return its feature record
    pub fn analyze(&self, content: &str) -> ContentFeatures {
        let p = self.patterns;

        let mut style_sources = BTreeSet::new();
        for stylesheet in &p.stylesheet_hrefs {
            collect_captures(stylesheet, content, &mut style_sources);
        }

        let features = ContentFeatures {
            has_script: p.script_tag.is_match(content),
            has_inline_script: p.inline_script.is_match(content),
            has_eval: p.eval_call.is_match(content) || p.document_write.is_match(content),
            has_event_handlers: p.event_handler.is_match(content),
            has_form: p.form_tag.is_match(content),
            img_sources: captures_of(&p.img_src, content),
            style_sources,
            font_sources: captures_of(&p.font_href, content),
        };

        log::debug!(
            "Analyzed {} bytes: script={} inline={} eval={} handlers={} form={} img={} style={} font={}",
            content.len(),
            features.has_script,
            features.has_inline_script,
            features.has_eval,
            features.has_event_handlers,
            features.has_form,
            features.img_sources.len(),
            features.style_sources.len(),
            features.font_sources.len(),
        );

        features
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor").finish_non_exhaustive()
    }
}

/// Scan `content` with the shared default extractor
pub fn analyze(content: &str) -> ContentFeatures {
    FeatureExtractor::new().analyze(content)
}

fn captures_of(pattern: &Regex, content: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_captures(pattern, content, &mut found);
    found
}

// Matches are non-overlapping: each one is consumed and the scan resumes
// right after it.
fn collect_captures(pattern: &Regex, content: &str, into: &mut BTreeSet<String>) {
    for captures in pattern.captures_iter(content) {
        if let Some(value) = captures.get(1) {
            into.insert(value.as_str().to_string());
        }
    }
}
