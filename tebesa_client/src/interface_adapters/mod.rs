pub mod clients;
pub mod memory;
pub mod protocol;
pub mod state;

pub use clients::{HttpDocumentStore, HttpIdentityProvider};
pub use memory::{InMemoryDocumentStore, LocalIdentityProvider};
pub use state::{AppContext, Backend, SystemClock};
