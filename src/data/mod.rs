//! Reference datasets: partition keys, upstream parsers and loaders.

pub mod api_index;
pub mod global_strings;
mod keys;
mod target;

pub use api_index::{ApiIndexSource, ApiTable, parse_api_names};
pub use global_strings::{GlobalStringsSource, LocalizedString, StringTable, parse_global_strings};
pub use keys::{Flavor, Locale};
pub use target::{SearchTarget, corpus};
