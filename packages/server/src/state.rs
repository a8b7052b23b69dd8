use common::integrity::VerificationService;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub integrity: VerificationService,
    /// Cancelled at shutdown. Batch runs stop dispatching when it fires.
    pub shutdown: CancellationToken,
}
