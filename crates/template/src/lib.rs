//! Placeholder filename templates.
//!
//! A [`Template`] is parsed once from a pattern such as
//! `"{var}_{resolution}_{start_date}.tif"` and then used in both directions:
//! [`Template::format`] renders a set of [`Properties`] into a concrete name,
//! and [`Template::extract`] recovers the [`Properties`] from a name that was
//! rendered with the same template.

pub mod error;
mod properties;
mod template;

pub use crate::properties::Properties;
pub use crate::template::Template;
