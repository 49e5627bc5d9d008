//! Citadel CSP Crate
//!
//! Derives a Content-Security-Policy header value from what a document
//! actually contains. Content is scanned once into a [`ContentFeatures`]
//! record, which is then combined with an externally supplied malicious
//! verdict to produce the directive string.

pub mod config;
pub mod error;
pub mod features;
pub mod generator;
pub mod policy;
pub mod verdict;

pub use config::PolicyConfig;
pub use error::{CspError, CspResult};
pub use features::{analyze, ContentFeatures, FeatureExtractor};
pub use generator::{CspAnalysis, CspGenerator, CONTENT_SECURITY_POLICY_HEADER};
pub use policy::{generate, lockdown_policy, Directive, Policy, PolicySynthesizer};
pub use verdict::{LazyClassifier, MaliciousClassifier, StaticVerdict};
