use std::sync::Arc;

use tracklet_application::{ChangeNotifier, IdentityProvider, LifecycleService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle_service: LifecycleService,
    pub notifier: Arc<ChangeNotifier>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub frontend_url: String,
}
