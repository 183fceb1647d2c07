//! # Contrail Core Library
//!
//! Stores collections of time-indexed measurement signals (one flight or
//! one machining cycle per signal) in a single SQLite container and fits
//! statistical "confidence tubes" over a reference population:
//! - Signal container and tabular model ([`SignalStore`], [`SignalTable`])
//! - Tube fitting on a normalized position axis ([`TubeBuilder`], [`ConfidenceTube`])
//! - Per-row deviation scoring ([`TubeScorer`], [`ScoreSeries`])
//! - Out-of-tube segment extraction ([`ExcursionHighlighter`])
//! - Instant-label indicators and derived highlight stores ([`indicator`])

pub mod error;
pub mod indicator;
pub mod score;
pub mod segments;
pub mod store;
pub mod table;
pub mod tube;

pub use error::{Error, Result};
pub use score::{ScoreSeries, TubeScorer};
pub use segments::{ExcursionHighlighter, ExcursionSegment};
pub use store::{OpenMode, SignalMeta, SignalStore};
pub use table::SignalTable;
pub use tube::{ConfidenceTube, TubeBand, TubeBuilder};
