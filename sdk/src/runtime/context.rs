//! Request context handed to generated resolver implementations

use super::loader::LoadError;
use super::session::LoaderSession;

/// Per-request state visible to resolvers
#[derive(Clone, Debug)]
pub struct RequestContext {
    session: LoaderSession,
}

impl RequestContext {
    pub fn new(session: LoaderSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &LoaderSession {
        &self.session
    }

    /// Load through the request's batching session
    pub async fn load<V: Clone + Send + Sync + 'static>(
        &self,
        key: &str,
        id: i64,
    ) -> Result<Option<V>, LoadError> {
        self.session.load(key, id).await
    }
}
