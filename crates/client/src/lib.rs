//! Sitepulse HTTP clients
//!
//! Native Rust clients for the Plausible analytics API and the Vercel
//! deployment API. Both share one transport: a single authenticated JSON
//! request per call, no automatic retry, and an optional on-disk debug log of
//! every exchange.
//!
//! # Quick Start
//!
//! ```no_run
//! use sitepulse_client::PlausibleClient;
//! use sitepulse_core::{BreakdownQuery, NamedRange, Property, normalize};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PlausibleClient::builder("https://plausible.io/api")
//!     .api_key("your-api-key")
//!     .build()?;
//!
//! let today = chrono::Local::now().date_naive();
//! let range = normalize(&NamedRange::Last7Days.into(), today)?;
//! let query = BreakdownQuery::new("example.com", Property::EventPage, &range)?;
//!
//! for record in client.breakdown_all(&query).await? {
//!     println!("{record:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod debug_log;
pub mod deploy;
mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod plausible;
mod transport;

pub use debug_log::ApiLogger;
pub use deploy::{VercelClient, VercelClientBuilder};
pub use error::Error;
pub use plausible::{BranchOutcome, PageScope, PlausibleClient, PlausibleClientBuilder};
