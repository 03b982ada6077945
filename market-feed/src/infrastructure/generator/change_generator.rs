//! Tick-driven mutation of the instrument store
//!
//! Every tick walks the first `max_rows` slots in order and, per slot, draws
//! a number in `[0, 100)`:
//! - `< 5` on an occupied slot: the slot is emptied
//! - `< 10` otherwise: the slot gets a fresh quote, recreating the
//!   instrument from its catalog template if the slot was empty
//! - anything else: untouched
//!
//! The resulting `ChangeEvent` is published once per tick. Any error inside
//! a tick stops the generator for good.

use crate::application::ports::EventPublisher;
use crate::domain::{ChangeEvent, Clock, Instrument, Quote};
use crate::error::GeneratorError;
use crate::infrastructure::InstrumentStore;
use rand::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const DRAW_RANGE: u32 = 100;
const DELETE_BELOW: u32 = 5;
const UPSERT_BELOW: u32 = 10;

const MAX_PRICE: u32 = 500;
const MAX_QUANTITY: u32 = 5000;

/// Draw a fresh random quote
pub fn random_quote<R: Rng + ?Sized>(rng: &mut R) -> Quote {
    Quote::new(
        rng.gen_range(0..MAX_PRICE),
        rng.gen_range(0..MAX_QUANTITY),
        rng.gen_range(0..MAX_PRICE),
        rng.gen_range(0..MAX_QUANTITY),
    )
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of leading slots mutated each tick
    pub max_rows: usize,
    /// Delay between tick starts
    pub refresh_rate: Duration,
    /// Random seed (for reproducibility)
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn new(max_rows: usize, refresh_rate: Duration) -> Self {
        Self {
            max_rows,
            refresh_rate,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new(100, Duration::from_millis(500))
    }
}

/// Periodic mutation loop over the shared instrument store
///
/// The only writer of the store. Ticks never overlap: `run` awaits each tick
/// before the next interval fires, and publishing does not wait on consumers.
pub struct ChangeGenerator<C: Clock, P: EventPublisher> {
    store: Arc<InstrumentStore>,
    publisher: Arc<P>,
    clock: Arc<C>,
    config: GeneratorConfig,
    rng: StdRng,
    tick: u64,
}

impl<C: Clock + 'static, P: EventPublisher + 'static> ChangeGenerator<C, P> {
    pub fn new(
        store: Arc<InstrumentStore>,
        publisher: Arc<P>,
        clock: Arc<C>,
        config: GeneratorConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        ChangeGenerator {
            store,
            publisher,
            clock,
            config,
            rng,
            tick: 0,
        }
    }

    /// Number of ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Slots touched per tick: `min(max_rows, capacity)`
    pub fn active_slots(&self) -> usize {
        self.config.max_rows.min(self.store.capacity())
    }

    /// Apply one tick of mutations to the store without publishing
    pub fn run_tick(&mut self) -> Result<ChangeEvent, GeneratorError> {
        self.tick += 1;
        let mut updated = Vec::new();
        let mut deleted = Vec::new();

        for position in 0..self.active_slots() {
            let draw = self.rng.gen_range(0..DRAW_RANGE);
            if draw >= UPSERT_BELOW {
                continue;
            }

            let current = self.store.slot(position)?;
            match current {
                Some(_) if draw < DELETE_BELOW => {
                    self.store.clear_slot(position)?;
                    deleted.push(position);
                }
                _ => {
                    let template = self
                        .store
                        .template(position)
                        .ok_or(GeneratorError::MissingTemplate(position))?;
                    let instrument =
                        Instrument::new(template, random_quote(&mut self.rng), self.clock.now());
                    self.store.set_slot(position, instrument.clone())?;
                    updated.push(instrument);
                }
            }
        }

        tracing::debug!(
            tick = self.tick,
            updated = updated.len(),
            deleted = deleted.len(),
            "Tick applied"
        );

        Ok(ChangeEvent::new(self.tick, updated, deleted))
    }

    /// Apply one tick and publish its change event
    pub async fn tick(&mut self) -> Result<u64, GeneratorError> {
        let event = self.run_tick()?;
        self.publisher.publish(event).await;
        Ok(self.tick)
    }

    /// Tick forever at the configured rate. Returns only on a fatal error.
    pub async fn run(mut self) -> Result<(), GeneratorError> {
        let period = self.config.refresh_rate.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            max_rows = self.config.max_rows,
            active_slots = self.active_slots(),
            refresh_rate_ms = period.as_millis() as u64,
            subscribers = self.publisher.subscriber_count(),
            "Change generator started"
        );

        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                tracing::error!(tick = self.tick, error = %e, "Change generator stopped");
                return Err(e);
            }
        }
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<Result<(), GeneratorError>> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogItem, InstrumentId};
    use crate::infrastructure::{BroadcastEventPublisher, SimulationClock};

    fn catalog(n: i64) -> Vec<CatalogItem> {
        (0..n)
            .map(|i| CatalogItem::new(i, format!("Item{}", i), format!("Type{}", i % 3)))
            .collect()
    }

    fn store(n: i64) -> Arc<InstrumentStore> {
        let clock = SimulationClock::fixed();
        let mut rng = StdRng::seed_from_u64(7);
        Arc::new(InstrumentStore::from_catalog(catalog(n), |item| {
            Instrument::new(item, random_quote(&mut rng), clock.now())
        }))
    }

    fn generator(
        store: Arc<InstrumentStore>,
        max_rows: usize,
    ) -> ChangeGenerator<SimulationClock, BroadcastEventPublisher> {
        ChangeGenerator::new(
            store,
            Arc::new(BroadcastEventPublisher::new(64)),
            Arc::new(SimulationClock::fixed()),
            GeneratorConfig::new(max_rows, Duration::from_millis(10)).with_seed(42),
        )
    }

    #[test]
    fn test_random_quote_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let q = random_quote(&mut rng);
            assert!(q.best_bid_price < MAX_PRICE && q.best_offer_price < MAX_PRICE);
            assert!(q.best_bid_quantity < MAX_QUANTITY && q.best_offer_quantity < MAX_QUANTITY);
        }
    }

    #[test]
    fn test_tick_event_matches_store_state() {
        let store = store(200);
        let mut generator = generator(Arc::clone(&store), 200);

        for _ in 0..50 {
            let event = generator.run_tick().unwrap();

            for position in &event.deleted {
                assert_eq!(store.slot(*position).unwrap(), None);
            }
            for instrument in &event.updated {
                let position = instrument.id as usize;
                assert_eq!(store.slot(position).unwrap().as_ref(), Some(instrument));
                assert_eq!(&instrument.name, &store.template(position).unwrap().name);
            }

            let deleted_ids: Vec<InstrumentId> =
                event.deleted.iter().map(|p| *p as InstrumentId).collect();
            assert!(event.updated.iter().all(|i| !deleted_ids.contains(&i.id)));
        }
        assert_eq!(generator.ticks(), 50);
    }

    #[test]
    fn test_slots_beyond_max_rows_are_untouched() {
        let store = store(100);
        let before: Vec<_> = (10..100).map(|p| store.slot(p).unwrap()).collect();

        let mut generator = generator(Arc::clone(&store), 10);
        for _ in 0..100 {
            let event = generator.run_tick().unwrap();
            assert!(event.deleted.iter().all(|p| *p < 10));
            assert!(event.updated.iter().all(|i| i.id < 10));
        }

        let after: Vec<_> = (10..100).map(|p| store.slot(p).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_max_rows_larger_than_store() {
        let store = store(5);
        let mut generator = generator(Arc::clone(&store), 1000);
        assert_eq!(generator.active_slots(), 5);
        for _ in 0..20 {
            generator.run_tick().unwrap();
        }
        assert!(store.occupied() <= store.capacity());
    }

    #[test]
    fn test_emptied_slots_are_recreated_from_template() {
        let store = store(50);
        let mut generator = generator(Arc::clone(&store), 50);

        let mut recreated = false;
        let mut emptied = std::collections::HashSet::new();
        for _ in 0..500 {
            let event = generator.run_tick().unwrap();
            for instrument in &event.updated {
                if emptied.remove(&(instrument.id as usize)) {
                    recreated = true;
                    assert_eq!(instrument.description, format!("Type{}", instrument.id % 3));
                }
            }
            emptied.extend(event.deleted.iter().copied());
        }
        assert!(recreated);
    }

    #[test]
    fn test_same_seed_same_ticks() {
        let mut a = generator(store(30), 30);
        let mut b = generator(store(30), 30);
        for _ in 0..10 {
            let ea = a.run_tick().unwrap();
            let eb = b.run_tick().unwrap();
            assert_eq!(ea.deleted, eb.deleted);
            let qa: Vec<_> = ea.updated.iter().map(|i| (i.id, i.quote)).collect();
            let qb: Vec<_> = eb.updated.iter().map(|i| (i.id, i.quote)).collect();
            assert_eq!(qa, qb);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_publishes_one_event_per_tick() {
        let publisher = Arc::new(BroadcastEventPublisher::new(64));
        let mut rx = publisher.subscribe();
        let generator = ChangeGenerator::new(
            store(20),
            Arc::clone(&publisher),
            Arc::new(SimulationClock::fixed()),
            GeneratorConfig::new(20, Duration::from_millis(100)).with_seed(3),
        );

        let started = Instant::now();
        let handle = generator.spawn();

        for expected in 1..=3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.tick, expected);
        }
        assert!(started.elapsed() >= Duration::from_millis(300));

        handle.abort();
    }
}
