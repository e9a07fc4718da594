use tracing::debug;

use crate::core::Field;
use crate::error::{LoaderError, LoaderResult};
use crate::extensions::LoaderEvent;
use crate::source::DataSource;

use super::TileLoader;

impl<S: DataSource> TileLoader<S> {
    /// Active fields in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.keys()
    }

    #[must_use]
    pub fn has_field(&self, field: &Field) -> bool {
        self.fields.contains_key(field)
    }

    /// Query context a field is currently loaded under.
    #[must_use]
    pub fn field_context(&self, field: &Field) -> Option<u64> {
        self.fields.get(field).copied()
    }

    /// Adds a field under query context `0`. Returns `false` if it was already active.
    pub fn add_field(&mut self, field: Field) -> bool {
        self.add_field_with_context(field, 0)
    }

    /// Adds a field under an explicit query context (a fingerprint of the
    /// filters the host applies to it). Returns `false` if it was already active.
    pub fn add_field_with_context(&mut self, field: Field, context: u64) -> bool {
        if self.fields.contains_key(&field) {
            return false;
        }
        debug!(%field, context, "add field");
        self.fields.insert(field, context);
        true
    }

    /// Replaces the active field set. Fields that stay keep their state.
    pub fn set_fields(&mut self, fields: impl IntoIterator<Item = Field>) {
        let next: Vec<Field> = fields.into_iter().collect();
        let dropped: Vec<Field> = self
            .fields
            .keys()
            .filter(|field| !next.contains(field))
            .cloned()
            .collect();
        for field in &dropped {
            self.forget_field_state(field);
            self.fields.shift_remove(field);
        }
        for field in next {
            self.add_field(field);
        }
    }

    pub fn remove_field(&mut self, field: &Field) -> LoaderResult<()> {
        if !self.fields.contains_key(field) {
            return Err(LoaderError::UnknownField(field.to_string()));
        }
        self.forget_field_state(field);
        self.fields.shift_remove(field);
        Ok(())
    }

    /// Discards everything loaded for `field` and moves it to a new query
    /// context. Cached entries from the old context are ignored afterwards,
    /// and fetches still in flight for it are discarded when they land.
    pub fn reset_field(&mut self, field: &Field, context: u64) -> LoaderResult<()> {
        let Some(slot) = self.fields.get_mut(field) else {
            return Err(LoaderError::UnknownField(field.to_string()));
        };
        *slot = context;
        self.forget_field_state(field);
        self.emit_event(LoaderEvent::FieldReset {
            field: field.clone(),
        });
        Ok(())
    }

    /// Resets every active field into `context`.
    pub fn reset_all(&mut self, context: u64) {
        let fields: Vec<Field> = self.fields.keys().cloned().collect();
        for field in fields {
            if let Err(err) = self.reset_field(&field, context) {
                debug!(%field, error = %err, "skip reset");
            }
        }
    }

    fn forget_field_state(&mut self, field: &Field) {
        let dropped = self.coverage.remove_field(field);
        self.bins.remove_field(field);
        self.requests.forget_field(field);
        self.field_levels.remove(field);
        self.hydrated.retain(|key| &key.field != field);
        debug!(%field, dropped_series = dropped, "forget field state");
    }
}
