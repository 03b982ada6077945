//! Market Data Feed Simulator
//!
//! Streams simulated quote updates for a fixed instrument catalog to
//! WebSocket subscribers.
//!
//! # Architecture
//!
//! - **Domain**: instruments, quotes, change events and the clock abstraction
//! - **Application**: port traits and the change consolidation use case
//! - **Infrastructure**: the slot store, tick generator, subscription
//!   registry, catalog and configuration loading
//! - **Presentation**: WebSocket sessions and the per-tick dispatcher
//!
//! # Data flow
//!
//! The change generator mutates the store every tick and publishes a
//! [`ChangeEvent`] on a broadcast channel. The dispatcher consolidates each
//! event once, against a cache of last-sent values, and hands every
//! connection the subset matching its subscriptions.
//!
//! # Example
//!
//! ```ignore
//! use market_feed::{FeedConfig, FeedServer, JsonFileCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = FeedConfig::default();
//!     let catalog = JsonFileCatalog::new(&config.catalog_path);
//!     let server = FeedServer::from_source(config, &catalog)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use domain::{
    CatalogItem, ChangeEvent, Clock, ConsolidatedEntry, Instrument, InstrumentId, Quote,
    SlotPosition, Timestamp,
};

pub use application::{CatalogSource, ChangeConsolidator, ConnectionId, EventPublisher};

pub use infrastructure::{
    BroadcastEventPublisher, ChangeGenerator, FeedConfig, GeneratorConfig, InstrumentStore,
    JsonFileCatalog, ServerConfig, SimulationClock, SubscriptionRegistry,
};

pub use error::{CatalogError, ConfigError, GeneratorError, ServerError};

pub use presentation::{DispatchStats, Dispatcher, WsState};

use axum::{Router, routing::get};
use rand::{SeedableRng, rngs::StdRng};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// The feed server: shared store and registry plus the tasks driving them
pub struct FeedServer<C: Clock + 'static> {
    pub config: FeedConfig,
    pub clock: Arc<C>,
    pub store: Arc<InstrumentStore>,
    pub registry: Arc<SubscriptionRegistry>,
    pub event_publisher: Arc<BroadcastEventPublisher>,
}

impl<C: Clock + 'static> FeedServer<C> {
    /// Create a feed over `catalog`, quoting every instrument at random
    pub fn with_clock(config: FeedConfig, catalog: Vec<CatalogItem>, clock: Arc<C>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = clock.now();
        let store = Arc::new(InstrumentStore::from_catalog(catalog, |item| {
            Instrument::new(item, infrastructure::random_quote(&mut rng), now)
        }));
        let event_publisher = Arc::new(BroadcastEventPublisher::new(config.event_capacity));

        FeedServer {
            config,
            clock,
            store,
            registry: Arc::new(SubscriptionRegistry::new()),
            event_publisher,
        }
    }

    /// Create a feed from a catalog source
    pub fn from_source_with_clock(
        config: FeedConfig,
        source: &dyn CatalogSource,
        clock: Arc<C>,
    ) -> Result<Self, CatalogError> {
        let catalog = source.load()?;
        Ok(Self::with_clock(config, catalog, clock))
    }

    /// Create WebSocket state
    pub fn ws_state(&self) -> Arc<WsState> {
        Arc::new(WsState {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            max_rows: self.config.max_rows,
            outbound_capacity: self.config.server.outbound_capacity,
        })
    }

    /// Router serving the WebSocket endpoint. Other paths are not routed.
    pub fn router(&self) -> Router {
        let path = if self.config.server.ws_path.starts_with('/') {
            self.config.server.ws_path.clone()
        } else {
            format!("/{}", self.config.server.ws_path)
        };

        Router::new()
            .route(&path, get(presentation::ws_handler))
            .with_state(self.ws_state())
            .layer(TraceLayer::new_for_http())
    }

    /// Dispatcher whose cache starts from the instruments listed at startup
    pub fn dispatcher(&self) -> Dispatcher {
        let consolidator = ChangeConsolidator::seeded(self.store.snapshot(self.config.max_rows));
        Dispatcher::new(Arc::clone(&self.registry), consolidator)
    }

    /// Subscribe a dispatcher to change events and run it in the background
    pub fn spawn_dispatcher(&self) -> JoinHandle<()> {
        self.dispatcher().spawn(self.event_publisher.subscribe())
    }

    pub fn generator(&self) -> ChangeGenerator<C, BroadcastEventPublisher> {
        ChangeGenerator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.event_publisher),
            Arc::clone(&self.clock),
            self.config.generator_config(),
        )
    }

    /// Serve on an already bound listener until the generator fails
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        // Dispatcher must subscribe before the first tick is published
        let dispatcher = self.spawn_dispatcher();
        let generator = self.generator().spawn();
        let router = self.router();

        tracing::info!(addr = %listener.local_addr()?, "Market feed listening");

        let result = tokio::select! {
            served = axum::serve(listener, router).into_future() => {
                served.map_err(ServerError::from)
            }
            stopped = generator => match stopped {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::from(e)),
                Err(e) => Err(ServerError::from(e)),
            },
        };

        dispatcher.abort();
        result
    }

    /// Bind the configured address and serve
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Get the event publisher for subscribing to change events
    pub fn event_publisher(&self) -> &Arc<BroadcastEventPublisher> {
        &self.event_publisher
    }
}

impl FeedServer<SimulationClock> {
    /// Create a feed with the default simulation clock
    pub fn new(config: FeedConfig, catalog: Vec<CatalogItem>) -> Self {
        let clock = Arc::new(SimulationClock::new());
        Self::with_clock(config, catalog, clock)
    }

    /// Create a feed with fixed time (for testing)
    pub fn fixed_time(config: FeedConfig, catalog: Vec<CatalogItem>) -> Self {
        let clock = Arc::new(SimulationClock::fixed());
        Self::with_clock(config, catalog, clock)
    }

    /// Create a feed from a catalog source with the default simulation clock
    pub fn from_source(
        config: FeedConfig,
        source: &dyn CatalogSource,
    ) -> Result<Self, CatalogError> {
        let clock = Arc::new(SimulationClock::new());
        Self::from_source_with_clock(config, source, clock)
    }
}
