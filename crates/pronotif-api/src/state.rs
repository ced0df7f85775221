//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use pronotif_service::AccountService;

use crate::jwt::{JwtDecoder, JwtEncoder};

/// Shared dependencies, passed to every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Account lifecycle operations
    pub accounts: Arc<AccountService>,
    /// Bearer token encoder
    pub jwt_encoder: Arc<JwtEncoder>,
    /// Bearer token decoder
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(accounts: Arc<AccountService>, jwt_encoder: JwtEncoder, jwt_decoder: JwtDecoder) -> Self {
        Self {
            accounts,
            jwt_encoder: Arc::new(jwt_encoder),
            jwt_decoder: Arc::new(jwt_decoder),
            started_at: Instant::now(),
        }
    }
}
