//! Policy synthesis
//!
//! Turns a [`ContentFeatures`] record and a malicious verdict into a
//! Content-Security-Policy header value. Directive order is fixed:
//! `default-src` first, `report-uri` last.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::PolicyConfig;
use crate::error::CspResult;
use crate::features::ContentFeatures;

const SELF: &str = "'self'";
const NONE: &str = "'none'";
const UNSAFE_INLINE: &str = "'unsafe-inline'";

/// A single CSP directive such as `img-src 'self' https://a.com;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    name: String,
    sources: Vec<String>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    /// Append one source expression
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Append several source expressions in order
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_list(&self) -> &[String] {
        &self.sources
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for source in &self.sources {
            write!(f, " {}", source)?;
        }
        f.write_str(";")
    }
}

/// An ordered list of directives forming one header value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    directives: Vec<Directive>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// First directive with the given name
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}

/// The policy served for content classified as malicious: every fetch,
/// navigation and embedding directive is set to `'none'`.
pub fn lockdown_policy(report_uri: &str) -> Policy {
    let mut policy = Policy::new();
    for name in [
        "default-src",
        "script-src",
        "object-src",
        "style-src",
        "img-src",
        "font-src",
        "connect-src",
        "form-action",
        "frame-ancestors",
        "base-uri",
    ] {
        policy.push(Directive::new(name).source(NONE));
    }
    policy.push(Directive::new("report-uri").source(report_uri));
    policy
}

/// Inline script presence also grants `'unsafe-inline'` to `style-src`.
///
/// This carries over existing behavior and is switchable through
/// [`PolicyConfig::inline_script_unlocks_inline_style`].
pub fn inline_script_unlocks_inline_style(features: &ContentFeatures, config: &PolicyConfig) -> bool {
    config.inline_script_unlocks_inline_style && features.has_inline_script
}

/// Builds CSP header values from content features
#[derive(Debug, Clone, Default)]
pub struct PolicySynthesizer {
    config: PolicyConfig,
}

impl PolicySynthesizer {
    /// Create a synthesizer after validating `config`, so no configured
    /// value can break out of its directive.
    pub fn new(config: PolicyConfig) -> CspResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Build the structured policy for `features`.
    ///
    /// A malicious verdict ignores `features` and yields the lockdown policy.
    pub fn synthesize(&self, features: &ContentFeatures, is_malicious: bool) -> Policy {
        if is_malicious {
            log::warn!("Content classified as malicious, emitting lockdown policy");
            return lockdown_policy(&self.config.report_uri);
        }

        let mut policy = Policy::new();
        policy.push(Directive::new("default-src").source(SELF));

        if features.has_script {
            if features.allows_dynamic_code() {
                log::debug!("Inline or dynamic script detected, disabling scripts");
                policy.push(Directive::new("script-src").source(NONE));
            } else {
                policy.push(
                    Directive::new("script-src")
                        .source(SELF)
                        .sources(self.config.trusted_script_origins.iter().cloned()),
                );
            }
        } else {
            policy.push(Directive::new("script-src").source(NONE));
            policy.push(Directive::new("object-src").source(NONE));
        }

        if features.has_form {
            policy.push(Directive::new("form-action").source(SELF));
        }

        if !features.img_sources.is_empty() {
            policy.push(self_plus_absolute("img-src", &features.img_sources));
        }

        if !features.style_sources.is_empty() {
            let mut style = self_plus_absolute("style-src", &features.style_sources);
            if inline_script_unlocks_inline_style(features, &self.config) {
                style = style.source(UNSAFE_INLINE);
            }
            policy.push(style);
        }

        if !features.font_sources.is_empty() {
            policy.push(self_plus_absolute("font-src", &features.font_sources));
        }

        policy.push(Directive::new("report-uri").source(self.config.report_uri.as_str()));
        policy
    }

    /// Build the header value for `features`
    pub fn generate(&self, features: &ContentFeatures, is_malicious: bool) -> String {
        self.synthesize(features, is_malicious).to_string()
    }
}

/// Generate a header value with the default configuration
pub fn generate(features: &ContentFeatures, is_malicious: bool) -> String {
    PolicySynthesizer::default().generate(features, is_malicious)
}

// Only absolute URLs are allow-listed. Relative paths and other schemes
// still trigger the directive but are covered by 'self' or dropped.
fn self_plus_absolute(name: &str, sources: &BTreeSet<String>) -> Directive {
    Directive::new(name)
        .source(SELF)
        .sources(sources.iter().filter(|s| s.starts_with("http")).cloned())
}
