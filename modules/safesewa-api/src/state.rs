use std::sync::Arc;

use safesewa_hub::BroadcastHub;
use safesewa_sos::SosManager;
use safesewa_store::RecordStore;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub hub: Arc<BroadcastHub>,
    pub sos: SosManager,
}
