pub use super::audit_logs::Entity as AuditLogs;
pub use super::categories::Entity as Categories;
pub use super::galleries::Entity as Galleries;
pub use super::gallery_tags::Entity as GalleryTags;
pub use super::media_tags::Entity as MediaTags;
pub use super::media_variants::Entity as MediaVariants;
pub use super::tags::Entity as Tags;
