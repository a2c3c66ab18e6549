//! # cmif-kit
//!
//! A parsing and aggregation toolkit for CMIF/TEI correspondence metadata.
//!
//! cmif-kit turns heterogeneous letter-exchange metadata — CMIF TEI-XML
//! files and the correspSearch web API's TEI-JSON — into one normalized
//! model: letters with senders, recipients, places, and dates, each
//! annotated with an explicit uncertainty classification, plus per-entity
//! statistics and a dataset summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ file / URL / │──▶│  TEI extractor │──▶│ indices + meta │
//! │ inline XML   │   │  (quick-xml)   │   └──────┬────────┘
//! └──────────────┘   └───────────────┘          │
//! ┌──────────────┐   ┌───────────────┐          ▼
//! │ correspSearch│──▶│  JSON transform│──▶ {letters, indices, meta}
//! │ API (paged)  │   │  (serde_json)  │          │
//! └──────────────┘   └───────────────┘          ▼
//!                                     coordinate enrichment
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Normalized letter/person/place model and result shape |
//! | [`refs`] | Authority (GND/VIAF/LoC/BnF) and GeoNames URI resolvers |
//! | [`precision`] | Person/place/date uncertainty classification |
//! | [`tei`] | Namespace-aware TEI-XML `correspDesc` extraction |
//! | [`corresp_search`] | correspSearch API client, pagination, retry |
//! | [`index`] | Person/place/subject/language statistics maps |
//! | [`stats`] | Date range, unique counts, uncertainty distribution |
//! | [`enrich`] | GeoNames coordinate cache merge |
//! | [`pipeline`] | Source detection and end-to-end orchestration |
//! | [`config`] | TOML configuration |
//! | [`progress`] | Stderr progress reporting (human or JSON lines) |

pub mod config;
pub mod corresp_search;
pub mod enrich;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod precision;
pub mod progress;
pub mod refs;
pub mod stats;
pub mod tei;
