//! Event publication: a transport-agnostic pub/sub contract plus an in-memory bus.
//!
//! Persistence adapters publish committed domain events here **after** the append
//! succeeded; the bus is for distribution, never the source of truth.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
