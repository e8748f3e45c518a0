pub mod cache;
pub mod config;
pub mod events;
pub mod invoker;
pub mod keys;
pub mod network;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod types;

pub use cache::{NoopCache, ResultCache};
pub use config::SchedulerConfig;
pub use events::{Event, EventBus, EventHandler};
pub use invoker::{
    CompletionSignal, Invocation, InvocationSender, InvokeError, InvokeOptions, RemoteInvoker,
};
pub use keys::{ACTION_KEY_PREFIX, ActionKey, InstanceKey, action_key, instance_key};
pub use network::NetworkMonitor;
pub use scheduler::{ActionScheduler, SchedulerError};
#[cfg(any(feature = "sqlite", test))]
pub use store::SqliteStore;
pub use store::{ActionStore, MemoryStore, StoreError};
pub use types::{ActionDescriptor, PendingAction, TargetParams};
