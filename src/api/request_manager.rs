use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::windowing::bins_fit_window;
use crate::core::{Bin, BinStore, CoverageStore, Field, IntervalSet, SeriesKey, Tile, TimeRange};
use crate::error::FetchError;
use crate::source::DataSource;

/// Monotonic identifier of one viewport evaluation cycle.
pub type Epoch = u64;

/// Identity of a fetch: series plus exact range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub series: SeriesKey,
    pub range: TimeRange,
}

impl TileKey {
    #[must_use]
    pub fn of(tile: &Tile) -> Self {
        Self {
            series: SeriesKey::new(tile.field.clone(), tile.level),
            range: tile.range,
        }
    }
}

/// Lifecycle of one tile key within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Idle,
    Dispatched,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    /// Bins were stored and the range marked loaded; `bins` may be zero.
    Loaded { bins: usize },
    /// The range was marked failed.
    Failed { error: FetchError, retryable: bool },
    /// The tile's field was removed or reset while the fetch was in flight.
    Discarded,
}

/// Result of applying one completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub tile: Tile,
    pub epoch: Epoch,
    /// The fetch belongs to an older cycle; it was applied without follow-up dispatches.
    pub stale: bool,
    pub outcome: TileOutcome,
    /// Queued tiles dispatched into the slot this completion freed.
    pub dispatched: Vec<Tile>,
}

/// Bookkeeping of one `submit` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReport {
    pub submitted: usize,
    /// Candidates fully covered by in-flight or queued work and dropped.
    pub deduplicated: usize,
    /// Candidates narrowed to the parts not already requested.
    pub trimmed: usize,
    pub dispatched: Vec<Tile>,
    pub queued: usize,
}

/// Completed fetch waiting to be applied.
pub struct Completion {
    tile: Tile,
    epoch: Epoch,
    ticket: u64,
    result: Result<Vec<Bin>, FetchError>,
}

impl Completion {
    #[must_use]
    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    epoch: Epoch,
    ticket: u64,
}

#[derive(Debug, Clone)]
struct Queued {
    tile: Tile,
    epoch: Epoch,
}

/// Deduplicates, bounds and dispatches tile fetches for one loader instance.
///
/// All state is owned here; separate loaders never share in-flight or epoch
/// bookkeeping. Responses are applied one at a time in completion order.
pub struct RequestManager<S: DataSource> {
    source: Arc<S>,
    max_in_flight: usize,
    epoch: Epoch,
    next_ticket: u64,
    in_flight: HashMap<TileKey, InFlight>,
    queue: VecDeque<Queued>,
    fetches: FuturesUnordered<BoxFuture<'static, Completion>>,
    settled: HashMap<TileKey, RequestState>,
    /// Fetches still running for forgotten fields. They hold budget slots
    /// until they land.
    detached: usize,
}

impl<S: DataSource> RequestManager<S> {
    #[must_use]
    pub fn new(source: Arc<S>, max_in_flight: usize) -> Self {
        Self {
            source,
            max_in_flight: max_in_flight.max(1),
            epoch: 0,
            next_ticket: 0,
            in_flight: HashMap::new(),
            queue: VecDeque::new(),
            fetches: FuturesUnordered::new(),
            settled: HashMap::new(),
            detached: 0,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Running fetches whose field was removed or reset.
    #[must_use]
    pub fn detached_len(&self) -> usize {
        self.detached
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Ranges currently dispatched for `series`, sorted.
    #[must_use]
    pub fn in_flight_ranges(&self, series: &SeriesKey) -> Vec<TimeRange> {
        let mut ranges: Vec<TimeRange> = self
            .in_flight
            .keys()
            .filter(|key| &key.series == series)
            .map(|key| key.range)
            .collect();
        ranges.sort_unstable();
        ranges
    }

    #[must_use]
    pub fn request_state(&self, tile: &Tile) -> RequestState {
        let key = TileKey::of(tile);
        if self.in_flight.contains_key(&key) {
            return RequestState::Dispatched;
        }
        self.settled.get(&key).copied().unwrap_or(RequestState::Idle)
    }

    /// Starts a new cycle. Queued tiles of older cycles are cancelled; fetches
    /// already in flight keep running and are applied when they land.
    pub fn begin_cycle(&mut self) -> Epoch {
        self.epoch += 1;
        self.settled.clear();
        let cancelled = self.queue.len();
        for queued in self.queue.drain(..) {
            self.settled
                .insert(TileKey::of(&queued.tile), RequestState::Cancelled);
        }
        debug!(
            epoch = self.epoch,
            cancelled,
            in_flight = self.in_flight.len(),
            "begin load cycle"
        );
        self.epoch
    }

    /// Everything already requested (in flight or queued) for `series`.
    fn requested(&self, series: &SeriesKey) -> IntervalSet {
        let in_flight = self
            .in_flight
            .keys()
            .filter(|key| &key.series == series)
            .map(|key| key.range);
        let queued = self
            .queue
            .iter()
            .filter(|queued| queued.tile.field == series.field && queued.tile.level == series.level)
            .map(|queued| queued.tile.range);
        IntervalSet::from_ranges(in_flight.chain(queued))
    }

    /// Accepts prioritized tiles for `epoch`, drops or trims duplicates, and
    /// dispatches as many as the in-flight budget allows.
    pub fn submit(&mut self, epoch: Epoch, tiles: Vec<Tile>, coverage: &mut CoverageStore) -> SubmitReport {
        let mut report = SubmitReport {
            submitted: tiles.len(),
            ..SubmitReport::default()
        };
        let mut requested: HashMap<SeriesKey, IntervalSet> = HashMap::new();

        for tile in tiles {
            let series = SeriesKey::new(tile.field.clone(), tile.level);
            let taken = requested
                .entry(series)
                .or_insert_with_key(|series| self.requested(series));

            if taken.contains_range(tile.range) {
                trace!(field = %tile.field, range = %tile.range, "drop superseded tile");
                report.deduplicated += 1;
                continue;
            }
            let pieces = taken.gaps(tile.range);
            if pieces.len() != 1 || pieces[0] != tile.range {
                report.trimmed += 1;
            }
            for piece in pieces {
                taken.insert(piece);
                self.queue.push_back(Queued {
                    tile: Tile {
                        range: piece,
                        ..tile.clone()
                    },
                    epoch,
                });
            }
        }

        report.dispatched = self.refill(coverage);
        report.queued = self.queue.len();
        debug!(
            epoch,
            submitted = report.submitted,
            deduplicated = report.deduplicated,
            trimmed = report.trimmed,
            dispatched = report.dispatched.len(),
            queued = report.queued,
            "submitted tiles"
        );
        report
    }

    /// Moves queued tiles into free in-flight slots, preserving queue order.
    pub fn refill(&mut self, coverage: &mut CoverageStore) -> Vec<Tile> {
        let mut dispatched = Vec::new();
        while self.in_flight.len() + self.detached < self.max_in_flight {
            let Some(queued) = self.queue.pop_front() else {
                break;
            };
            dispatched.push(self.dispatch(queued, coverage));
        }
        dispatched
    }

    fn dispatch(&mut self, queued: Queued, coverage: &mut CoverageStore) -> Tile {
        let Queued { tile, epoch } = queued;
        let key = TileKey::of(&tile);
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        coverage.entry(key.series.clone()).mark_pending(tile.range);
        self.in_flight.insert(key, InFlight { epoch, ticket });
        trace!(
            field = %tile.field,
            level_ms = tile.level.as_ms(),
            from_ms = tile.range.from_ms(),
            to_ms = tile.range.to_ms(),
            epoch,
            "dispatch tile"
        );

        let source = Arc::clone(&self.source);
        let request = tile.clone();
        self.fetches.push(Box::pin(async move {
            let result = source
                .fetch_bins(&request.field, request.level, request.range)
                .await;
            Completion {
                tile: request,
                epoch,
                ticket,
                result,
            }
        }));
        tile
    }

    /// Waits for the next fetch to finish. Returns `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.fetches.next().await
    }

    /// Records a completed fetch into coverage and bin storage.
    ///
    /// Completions from older cycles are applied like any other but never
    /// dispatch follow-up work; only the current cycle refills freed slots.
    pub fn apply(
        &mut self,
        completion: Completion,
        coverage: &mut CoverageStore,
        bins: &mut BinStore,
    ) -> ApplyReport {
        let Completion {
            tile,
            epoch,
            ticket,
            result,
        } = completion;
        let key = TileKey::of(&tile);
        let stale = epoch < self.epoch;

        let owned = self
            .in_flight
            .get(&key)
            .is_some_and(|in_flight| in_flight.ticket == ticket);
        if !owned {
            self.detached = self.detached.saturating_sub(1);
            debug!(
                field = %tile.field,
                range = %tile.range,
                detached = self.detached,
                "discard fetch for reset field"
            );
            return ApplyReport {
                tile,
                epoch,
                stale,
                outcome: TileOutcome::Discarded,
                dispatched: Vec::new(),
            };
        }
        self.in_flight.remove(&key);

        let result = result.and_then(|fetched| {
            if bins_fit_window(&fetched, tile.range) {
                Ok(fetched)
            } else {
                Err(FetchError::MalformedResponse(format!(
                    "bins outside requested range {} or out of order",
                    tile.range
                )))
            }
        });

        let outcome = match result {
            Ok(fetched) => {
                let count = fetched.len();
                coverage.entry(key.series.clone()).mark_loaded(tile.range);
                bins.replace_range(key.series.clone(), tile.range, fetched);
                self.settled.insert(key, RequestState::Succeeded);
                trace!(
                    field = %tile.field,
                    range = %tile.range,
                    bins = count,
                    epoch,
                    stale,
                    "tile loaded"
                );
                TileOutcome::Loaded { bins: count }
            }
            Err(error) => {
                coverage.entry(key.series.clone()).mark_failed(tile.range);
                self.settled.insert(key, RequestState::Failed);
                let retryable = error.is_retryable();
                warn!(
                    field = %tile.field,
                    range = %tile.range,
                    error = %error,
                    retryable,
                    "tile fetch failed"
                );
                TileOutcome::Failed { error, retryable }
            }
        };

        let dispatched = if stale {
            Vec::new()
        } else {
            self.refill(coverage)
        };

        ApplyReport {
            tile,
            epoch,
            stale,
            outcome,
            dispatched,
        }
    }

    /// Forgets queued and in-flight work for `field`. Fetches already running
    /// keep their budget slot and are discarded when they complete.
    pub fn forget_field(&mut self, field: &Field) {
        self.queue.retain(|queued| &queued.tile.field != field);
        let before = self.in_flight.len();
        self.in_flight.retain(|key, _| &key.series.field != field);
        self.detached += before - self.in_flight.len();
        self.settled.retain(|key, _| &key.series.field != field);
    }
}
