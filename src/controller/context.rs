use kube::Client;

/// Shared context for status writers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
}

impl Context {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}
