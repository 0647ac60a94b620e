use crate::entities::media_variants::MediaOrigin;
use crate::services::crop::CropBox;

pub struct NewMediaGroup {
    pub owner_id: Option<String>,
    pub origin: MediaOrigin,
    pub source_bytes: Vec<u8>,
    pub original_name: Option<String>,
    pub alt_text: Option<String>,
    pub crop: Option<CropBox>,
    pub sort_order: i32,
    pub tags: Vec<String>,
}

/// New source for an existing group. Unset fields carry over from the old group.
pub struct ReplaceMedia {
    pub source_bytes: Vec<u8>,
    pub original_name: Option<String>,
    pub crop: Option<CropBox>,
    pub alt_text: Option<String>,
}

/// Combined edit of one group, applied as replace, then move, then details
#[derive(Default)]
pub struct MediaUpdate {
    pub replacement: Option<ReplaceMedia>,
    /// `Some(None)` detaches the group from its gallery
    pub owner_id: Option<Option<String>>,
    pub alt_text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub sort_order: Option<i32>,
}

/// Variant files written to storage whose rows are not inserted yet
pub(super) struct PreparedGroup {
    pub group_key: String,
    pub owner_id: Option<String>,
    pub origin: MediaOrigin,
    pub tags: Vec<String>,
    pub rows: Vec<crate::entities::media_variants::ActiveModel>,
    pub paths: Vec<String>,
}
