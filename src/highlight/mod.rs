//! Highlight Module
//!
//! Reader-side text highlighting for Psychepedia articles. A reader selects a
//! fragment of a rendered article, the fragment is located in the article's
//! canonical text (raw text with `**` markers removed), and the resulting span
//! is kept in a local key-value store so it survives reloads.
//!
//! # Pieces
//!
//! - [`Normalizer`]: raw article text to canonical text
//! - [`Resolver`]: selected fragment to a char [`Span`] of canonical text
//! - [`HighlightStore`]: ordered, non-overlapping records per article
//! - [`render`]: canonical text plus records to display segments
//! - [`HighlightSession`]: highlight-mode toggle and pending selection
//!
//! # Usage
//!
//! ```rust,ignore
//! use psychepedia::highlight::{HighlightSession, HighlightStore, Normalizer, Resolver, render};
//! use psychepedia::kv::MemoryStore;
//!
//! let canonical = Normalizer::default().normalize(&article.body);
//! let mut store = HighlightStore::new(MemoryStore::new());
//! let mut session = HighlightSession::new(Locale::En, true);
//!
//! session.select(&article.id, "**cognitive bias**");
//! session.commit(&mut store, &Resolver::default(), &canonical, None)?;
//!
//! let segments = render(&canonical, store.list(&article.id)?);
//! ```

mod normalize;
mod record;
mod render;
mod resolve;
mod store;
mod toolbar;

pub use normalize::{DEFAULT_MARKER, Normalizer, normalize};
pub use record::{HighlightRecord, compute_record_id};
pub use render::{Segment, escape_html, reconcile, render, to_html};
pub use resolve::{Resolver, Span, resolve, slice_chars};
pub use store::{HighlightStore, storage_key};
pub use toolbar::{HighlightSession, Labels, MODE_KEY, PendingSelection, labels};
