//! Output generation: static digest pages, hotbar caches and the ticker strip.
//!
//! # Submodules
//!
//! - [`digest`]: renders and writes the per-language digest page
//! - [`hotbar`]: collects hotbar headlines and writes the summary caches
//! - [`ticker`]: renders the scrolling ticker fragment
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── pl/
//! │   ├── aktualnosci.html   # digest
//! │   └── ticker.html        # ticker fragment
//! └── en/
//!     ├── news.html
//!     └── ticker.html
//!
//! cache_dir/
//! ├── news_summaries_pl.json
//! ├── news_hotbar_pl.json
//! ├── news_summaries_en.json
//! └── news_hotbar_en.json
//! ```

pub mod digest;
pub mod hotbar;
pub mod ticker;
