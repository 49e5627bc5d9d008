//! Malicious-content verdicts
//!
//! Policy synthesis only consumes a boolean. Where that boolean comes from
//! (a model, a rule engine, an upstream service) sits behind
//! [`MaliciousClassifier`]. Expensive classifiers can be wrapped in a
//! [`LazyClassifier`], which owns the resource and loads it exactly once on
//! first use instead of relying on process-global state.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{CspError, CspResult};

/// Source of the malicious verdict for a document
pub trait MaliciousClassifier: Send + Sync {
    /// Decide whether `content` is malicious
    fn is_malicious(&self, content: &str) -> CspResult<bool>;
}

/// A verdict decided ahead of time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticVerdict(pub bool);

impl StaticVerdict {
    pub const BENIGN: StaticVerdict = StaticVerdict(false);
    pub const MALICIOUS: StaticVerdict = StaticVerdict(true);
}

impl MaliciousClassifier for StaticVerdict {
    fn is_malicious(&self, _content: &str) -> CspResult<bool> {
        Ok(self.0)
    }
}

type Loader<C> = Box<dyn Fn() -> CspResult<C> + Send + Sync>;

/// Classifier whose backing resource is constructed on first use.
///
/// Loading runs at most once at a time. A successful load is kept for the
/// lifetime of the wrapper; a failed load is reported to the caller and
/// retried on the next call.
pub struct LazyClassifier<C> {
    loader: Loader<C>,
    inner: OnceLock<C>,
    init_lock: Mutex<()>,
}

impl<C: MaliciousClassifier> LazyClassifier<C> {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> CspResult<C> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            inner: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Whether the backing classifier has been constructed
    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Borrow the backing classifier, loading it if needed
    pub fn get(&self) -> CspResult<&C> {
        if let Some(classifier) = self.inner.get() {
            return Ok(classifier);
        }

        let _guard = self.init_lock.lock();
        // Another caller may have finished loading while we waited
        if let Some(classifier) = self.inner.get() {
            return Ok(classifier);
        }

        log::debug!("Loading classifier");
        let classifier = (self.loader)().map_err(|e| match e {
            CspError::Classifier(msg) => CspError::Classifier(msg),
            other => CspError::Classifier(format!("failed to load classifier: {}", other)),
        })?;
        Ok(self.inner.get_or_init(|| classifier))
    }
}

impl<C: MaliciousClassifier> MaliciousClassifier for LazyClassifier<C> {
    fn is_malicious(&self, content: &str) -> CspResult<bool> {
        self.get()?.is_malicious(content)
    }
}

impl<C> fmt::Debug for LazyClassifier<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClassifier")
            .field("loaded", &self.inner.get().is_some())
            .finish()
    }
}

impl<T: MaliciousClassifier + ?Sized> MaliciousClassifier for &T {
    fn is_malicious(&self, content: &str) -> CspResult<bool> {
        (**self).is_malicious(content)
    }
}

impl<T: MaliciousClassifier + ?Sized> MaliciousClassifier for Box<T> {
    fn is_malicious(&self, content: &str) -> CspResult<bool> {
        (**self).is_malicious(content)
    }
}

impl<T: MaliciousClassifier + ?Sized> MaliciousClassifier for Arc<T> {
    fn is_malicious(&self, content: &str) -> CspResult<bool> {
        (**self).is_malicious(content)
    }
}
