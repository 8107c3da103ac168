//! Pipeline events
//!
//! The coordinator publishes an [`EnsembleEvent`] for every aggregated
//! round, excluded model, missed consensus and weight update. Hosts that
//! audit or persist these subscribe to the [`EventBus`].
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Coordinator  │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, SharedEventBus};
pub use types::EnsembleEvent;
