//! Voter registry: resolves reviewer identities to voting credentials.
//!
//! Consumed read-only. The shipped implementation is a TOML roster file
//! maintained by the administrative side; the trait keeps a remote registry
//! swappable.

pub mod mock;
pub mod roster;
pub mod traits;

pub use mock::MockRegistry;
pub use roster::FileRoster;
pub use traits::{RegistryError, RegistryResult, VoterProfile, VoterRegistry};
