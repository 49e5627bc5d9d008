//! End-to-end header generation: size check, verdict, extraction, synthesis.

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::error::{CspError, CspResult};
use crate::features::{ContentFeatures, FeatureExtractor};
use crate::policy::PolicySynthesizer;
use crate::verdict::MaliciousClassifier;

/// Name of the response header carrying the generated policy
pub const CONTENT_SECURITY_POLICY_HEADER: &str = "Content-Security-Policy";

/// Result of analyzing one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CspAnalysis {
    pub features: ContentFeatures,
    pub is_malicious: bool,
    /// Header value
    pub policy: String,
}

/// Generates CSP header values for documents
#[derive(Debug)]
pub struct CspGenerator<C> {
    extractor: FeatureExtractor,
    synthesizer: PolicySynthesizer,
    classifier: C,
}

impl<C: MaliciousClassifier> CspGenerator<C> {
    /// Create a generator after validating `config`
    pub fn new(config: PolicyConfig, classifier: C) -> CspResult<Self> {
        Ok(Self {
            extractor: FeatureExtractor::new(),
            synthesizer: PolicySynthesizer::new(config)?,
            classifier,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        self.synthesizer.config()
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Analyze `content` and build its policy.
    ///
    /// Oversized content is rejected before it reaches the classifier or the
    /// pattern scanner.
    pub fn analyze(&self, content: &str) -> CspResult<CspAnalysis> {
        let limit = self.config().max_content_bytes;
        if content.len() > limit {
            log::warn!("Rejecting {} byte document, limit is {}", content.len(), limit);
            return Err(CspError::ContentTooLarge {
                size: content.len(),
                limit,
            });
        }

        let is_malicious = self.classifier.is_malicious(content)?;
        let features = self.extractor.analyze(content);
        let policy = self.synthesizer.generate(&features, is_malicious);

        Ok(CspAnalysis {
            features,
            is_malicious,
            policy,
        })
    }

    /// Header value for `content`
    pub fn generate(&self, content: &str) -> CspResult<String> {
        self.analyze(content).map(|analysis| analysis.policy)
    }
}
