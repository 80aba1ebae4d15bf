//! Aggregation and ranking over play events.
//!
//! Events flow one way: [`classify`] buckets each event, [`identity`] picks
//! its song key, [`aggregate`] folds everything into an
//! [`AggregateSnapshot`], and [`rank`] answers queries against it.

pub mod aggregate;
pub mod bucket;
pub mod classify;
pub mod identity;
pub mod rank;

pub use aggregate::{AggregateSnapshot, Policy, Summary, aggregate};
pub use bucket::Bucket;
pub use classify::{Classification, FULL_LISTEN_MS, classify};
pub use identity::{AlbumKey, ArtistKey, SongKey};
pub use rank::{QueryFilter, RankMode, RankedEntry, Ranking, UnknownRankMode, rank};
