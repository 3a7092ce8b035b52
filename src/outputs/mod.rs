//! Reading and writing the flat files exchanged between stages.
//!
//! # Submodules
//!
//! - [`json`]: JSON lines article files, the fetch snapshot, the per-day digest
//! - [`markdown`]: renders a digest as a front-matter Markdown post
//!
//! # Output Structure
//!
//! ```text
//! fetch/20240102/
//! ├── fetch_info.json      # boards saved by the fetch run
//! ├── newsplus             # raw subject listing per board
//! └── yahoo_top            # raw feed per configured feed
//!
//! transform/20240102/
//! ├── 5ch.jsonl            # absent when no thread matched the day
//! └── rss.jsonl            # absent when no feed entry matched the day
//!
//! analysis/20240102.json   # ranked digest
//!
//! posts/2024/01/02.md      # published post
//! ```

pub mod json;
pub mod markdown;
