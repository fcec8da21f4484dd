//! Common test infrastructure
//!
//! Integration tests drive the library against a scripted Last.fm API
//! instead of the network. Tests should only import from this module, not
//! from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{load_fixture, ScriptedApi};
//!
//! #[test]
//! fn test_single_page() {
//!     let api = ScriptedApi::new()
//!         .respond("user.getlovedtracks", &[], load_fixture("lovedtracks.json"));
//!     let client = api.client();
//!     // ...
//!     assert_eq!(api.requests_for("user.getlovedtracks").len(), 1);
//! }
//! ```

mod api;
mod constants;
mod fixtures;

// Public API - this is what tests import
pub use api::{Request, ScriptedApi};
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{load_fixture, paged_body, track_item};
