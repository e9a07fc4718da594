use tracing::debug;

use crate::error::{LoaderError, LoaderResult};
use crate::extensions::LoaderObserver;
use crate::source::DataSource;

use super::TileLoader;

impl<S: DataSource> TileLoader<S> {
    /// Adds an observer. Ids must be non-empty and unique per loader; events
    /// reach observers in registration order.
    pub fn register_observer(&mut self, observer: Box<dyn LoaderObserver>) -> LoaderResult<()> {
        self.check_observer_id(observer.id())?;
        debug!(observer = observer.id(), "register observer");
        self.observers.push(observer);
        Ok(())
    }

    /// Drops the observer registered as `observer_id`, reporting whether one existed.
    pub fn unregister_observer(&mut self, observer_id: &str) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id() != observer_id);
        before != self.observers.len()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn has_observer(&self, observer_id: &str) -> bool {
        self.observer_ids().any(|id| id == observer_id)
    }

    /// Ids of registered observers in dispatch order.
    pub fn observer_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.observers.iter().map(|observer| observer.id())
    }

    fn check_observer_id(&self, observer_id: &str) -> LoaderResult<()> {
        if observer_id.is_empty() {
            Err(LoaderError::InvalidObserver("empty observer id".to_owned()))
        } else if self.has_observer(observer_id) {
            Err(LoaderError::InvalidObserver(format!(
                "duplicate observer id `{observer_id}`"
            )))
        } else {
            Ok(())
        }
    }
}
