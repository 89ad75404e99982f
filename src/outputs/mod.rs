//! Files the pipeline derives from its raw artifacts.
//!
//! # Submodules
//!
//! - [`roundup_index`]: the date-sorted `roundups.tsv` consumed by the story stage
//! - [`dataset`]: the compiled `allsides.jsonl`
//!
//! # Output Structure
//!
//! ```text
//! <output>/
//! ├── roundups.tsv      # title, url, topic, date
//! └── allsides.jsonl    # one compiled story per line
//! ```

pub mod dataset;
pub mod roundup_index;
