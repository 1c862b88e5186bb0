//! The simple-index HTML repository backend: fetches a package's index page, parses its anchor
//! tags into candidate files, and caches the result per package name.

mod client;
mod html;

pub use client::{Error, RegistryClient};
pub use html::{IndexFile, SimpleIndexPage};
