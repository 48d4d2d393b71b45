//! Common utilities for tileprint.
//!
//! This crate provides shared infrastructure used by the render pipeline and
//! the command-line front end:
//! - **Fetching** - tile bytes over HTTP, `file://` and `data:` URLs
//! - **Pixel Buffers** - decoded RGBA images
//! - **URL Templates** - `{z}/{x}/{y}` expansion and relative resolution
//! - **Warning System** - deduplicated warnings routed through `log`

pub mod image;
pub mod net;
pub mod url;
pub mod warning;
