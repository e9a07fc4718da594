use crate::extensions::{LoaderContext, LoaderEvent};
use crate::source::DataSource;

use super::TileLoader;

impl<S: DataSource> TileLoader<S> {
    pub(super) fn loader_context(&self) -> LoaderContext {
        LoaderContext {
            epoch: self.requests.current_epoch(),
            level: self.level,
            visible_range: self.viewport.map(|viewport| viewport.visible_range),
            in_flight: self.requests.in_flight_len(),
            queued: self.requests.queued_len(),
        }
    }

    pub(super) fn emit_event(&mut self, event: LoaderEvent) {
        if self.observers.is_empty() {
            return;
        }
        let context = self.loader_context();
        for observer in &mut self.observers {
            observer.on_event(&event, context);
        }
    }
}
