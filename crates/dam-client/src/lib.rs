//! # dam-client — Collaborator Clients for the DAM Asset Service
//!
//! The asset service delegates two concerns to its DAM backend:
//!
//! - **media resolution** — asset path + format/dimension constraints to a
//!   concrete rendition URL and metadata ([`MediaResolver`]);
//! - **fingerprint listing** — the per-asset checksum/timestamp rows the
//!   checksum version strategy aggregates (`dam_core::AssetStore`).
//!
//! This crate defines the resolver contract with a deterministic
//! [`MockMediaResolver`], and ships HTTP adapters for both contracts
//! ([`HttpMediaResolver`], [`HttpAssetStore`]) for deployments with a
//! remote backend.

pub mod http_adapters;
pub mod resolver;

pub use http_adapters::{BackendConfig, HttpAssetStore, HttpMediaResolver};
pub use resolver::{
    MediaResolver, MockMediaResolver, RenditionRequest, ResolveError, ResolvedMedia,
};
