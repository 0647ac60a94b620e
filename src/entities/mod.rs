pub mod prelude;

pub mod audit_logs;
pub mod categories;
pub mod galleries;
pub mod gallery_tags;
pub mod media_tags;
pub mod media_variants;
pub mod tags;
