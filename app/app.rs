use std::sync::Arc;

use parking_lot::RwLock;
use predmarket::state::State;

/// Shared handle on the node state. Clones are cheap and all observe the
/// same instance; the lock makes each RPC operation atomic.
#[derive(Clone, Default)]
pub struct App {
    pub state: Arc<RwLock<State>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }
}
