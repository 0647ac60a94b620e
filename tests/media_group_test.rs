mod common;

use common::*;
use gallery_backend::api::error::AppError;
use gallery_backend::entities::media_variants::{self, MediaOrigin, VariantKind};
use gallery_backend::entities::prelude::*;
use gallery_backend::services::catalog::GalleryFilters;
use gallery_backend::services::crop::CropBox;
use gallery_backend::services::gallery_service::{CoverUpload, GalleryChanges};
use gallery_backend::services::media_repository::MediaRepository;
use gallery_backend::services::media_service::{MediaUpdate, NewMediaGroup};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn crop(x: f64, width: f64, orig: (f64, f64)) -> CropBox {
    CropBox {
        canvas_width: 1600.0,
        canvas_height: 1200.0,
        x,
        y: 0.0,
        width,
        height: 1200.0,
        orig_width: orig.0,
        orig_height: orig.1,
    }
}

fn cover(bytes: Vec<u8>, crop: Option<CropBox>) -> CoverUpload {
    CoverUpload {
        bytes,
        original_name: Some("cover.jpg".to_string()),
        crop,
        alt_text: None,
    }
}

fn standalone(owner_id: Option<String>, bytes: Vec<u8>) -> NewMediaGroup {
    NewMediaGroup {
        owner_id,
        origin: MediaOrigin::Standalone,
        source_bytes: bytes,
        original_name: Some("photo.png".to_string()),
        alt_text: None,
        crop: None,
        sort_order: 0,
        tags: vec!["Summer".to_string()],
    }
}

fn variant(group: &[media_variants::Model], kind: VariantKind) -> media_variants::Model {
    group
        .iter()
        .find(|row| row.variant_kind == kind)
        .cloned()
        .unwrap()
}

async fn gallery_with_cover(app: &TestApp, crop: Option<CropBox>) -> String {
    let category = seed_category(&app.db, "Events").await;
    let gallery = app
        .state
        .gallery_service
        .create(
            GalleryChanges {
                title: Some("Test".to_string()),
                category_id: Some(category.id),
                ..Default::default()
            },
            Some(cover(jpeg(1600, 1200), crop)),
            ACTOR,
        )
        .await
        .unwrap();
    gallery.id
}

async fn bare_gallery(app: &TestApp, title: &str) -> String {
    app.state
        .gallery_service
        .create(
            GalleryChanges {
                title: Some(title.to_string()),
                ..Default::default()
            },
            None,
            ACTOR,
        )
        .await
        .unwrap()
        .id
}

async fn item_count(app: &TestApp, gallery_id: &str) -> i32 {
    Galleries::find_by_id(gallery_id.to_string())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .item_count
}

#[tokio::test]
async fn test_cover_with_matching_crop_uses_left_half() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, Some(crop(0.0, 800.0, (1600.0, 1200.0)))).await;

    let groups = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.len(), 3);
    assert!(group.iter().all(|row| row.group_key == group[0].group_key));

    let large = variant(group, VariantKind::Large);
    assert_eq!((large.width, large.height), (1200, 900));
    let img = decode(&app.storage.get(&large.storage_path).unwrap()).to_rgb8();
    assert_eq!(img.dimensions(), (1200, 900));
    assert!(is_red(*img.get_pixel(600, 450)));

    // Original bytes are stored as uploaded
    let original = variant(group, VariantKind::Original);
    assert_eq!((original.width, original.height), (1600, 1200));
    assert!(!original.is_cover_candidate);
    assert!(large.is_cover_candidate);
    assert!(large.is_selected_cover);
}

#[tokio::test]
async fn test_cover_with_mismatched_crop_keeps_full_source() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, Some(crop(0.0, 800.0, (1000.0, 750.0)))).await;

    let groups = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap();
    let large = variant(&groups[0], VariantKind::Large);
    assert_eq!((large.width, large.height), (1200, 900));

    let img = decode(&app.storage.get(&large.storage_path).unwrap()).to_rgb8();
    assert!(is_red(*img.get_pixel(300, 450)));
    assert!(is_blue(*img.get_pixel(900, 450)));
}

#[tokio::test]
async fn test_reselecting_cover_leaves_one_selected_row() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, None).await;

    let second = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), png(640, 480)), ACTOR)
        .await
        .unwrap();
    // The gallery already had a cover, so the new group is not selected
    assert!(second.iter().all(|row| !row.is_selected_cover));
    assert_eq!(item_count(&app, &gallery_id).await, 1);

    let thumb = variant(&second, VariantKind::Thumbnail);
    app.state
        .media_service
        .set_selected_cover(&gallery_id, &thumb.id, ACTOR)
        .await
        .unwrap();

    let selected = MediaVariants::find()
        .filter(media_variants::Column::OwnerId.eq(&gallery_id))
        .filter(media_variants::Column::IsSelectedCover.eq(true))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].group_key, thumb.group_key);
    assert_eq!(selected[0].variant_kind, VariantKind::Large);
}

#[tokio::test]
async fn test_selecting_cover_from_another_gallery_is_rejected() {
    let app = setup_app().await;
    let first = gallery_with_cover(&app, None).await;
    let other = bare_gallery(&app, "Other").await;

    let groups = MediaRepository::groups_for_owner(&app.db, &first)
        .await
        .unwrap();
    let result = app
        .state
        .media_service
        .set_selected_cover(&other, &groups[0][0].id, ACTOR)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_replacing_cover_leaves_only_new_files() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, None).await;
    let old_group = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap()
        .remove(0);

    app.state
        .gallery_service
        .update(
            &gallery_id,
            GalleryChanges::default(),
            Some(cover(png(800, 600), None)),
            ACTOR,
        )
        .await
        .unwrap();

    for row in &old_group {
        assert!(!app.state.media_service.store().exists(&row.storage_path).await.unwrap());
    }

    let groups = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    let new_group = &groups[0];
    assert_ne!(new_group[0].group_key, old_group[0].group_key);
    assert!(new_group.iter().any(|row| row.is_selected_cover));
    for row in new_group {
        assert!(app.storage.contains(&row.storage_path));
    }
    assert_eq!(app.storage.keys().len(), 3);
}

#[tokio::test]
async fn test_reassigning_group_moves_files_and_counts() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Target").await;

    let group = app
        .state
        .media_service
        .create_group(standalone(None, png(640, 480)), ACTOR)
        .await
        .unwrap();
    assert!(group.iter().all(|row| row.storage_path.starts_with("media/unattached/")));

    let moved = app
        .state
        .media_service
        .update_media(
            &group[0].id,
            MediaUpdate {
                owner_id: Some(Some(gallery_id.clone())),
                ..Default::default()
            },
            ACTOR,
        )
        .await
        .unwrap();

    assert_eq!(moved.len(), 3);
    let prefix = format!("galleries/{}/", gallery_id);
    for row in &moved {
        assert_eq!(row.owner_id.as_deref(), Some(gallery_id.as_str()));
        assert!(row.storage_path.starts_with(&prefix));
        assert!(app.storage.contains(&row.storage_path));
    }
    for row in &group {
        assert!(!app.storage.contains(&row.storage_path));
    }
    assert_eq!(item_count(&app, &gallery_id).await, 1);

    // Detaching again gives the count back
    app.state
        .media_service
        .update_media(
            &moved[0].id,
            MediaUpdate {
                owner_id: Some(None),
                ..Default::default()
            },
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(item_count(&app, &gallery_id).await, 0);
}

#[tokio::test]
async fn test_deleting_group_removes_rows_files_and_count() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Holiday").await;

    let group = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), png(320, 240)), ACTOR)
        .await
        .unwrap();
    assert_eq!(item_count(&app, &gallery_id).await, 1);

    app.state
        .media_service
        .delete_group(&group[0].group_key, ACTOR)
        .await
        .unwrap();

    assert_eq!(item_count(&app, &gallery_id).await, 0);
    assert!(app.storage.keys().is_empty());
    let remaining = MediaVariants::find().count(&app.db).await.unwrap();
    assert_eq!(remaining, 0);

    let again = app
        .state
        .media_service
        .delete_group(&group[0].group_key, ACTOR)
        .await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_undecodable_upload_leaves_nothing_behind() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Broken").await;

    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(b"this is not an image body");
    let result = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), bytes), ACTOR)
        .await;

    assert!(matches!(result, Err(AppError::MediaProcessing(_))));
    assert!(app.storage.keys().is_empty());
    assert_eq!(MediaVariants::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(item_count(&app, &gallery_id).await, 0);
}

#[tokio::test]
async fn test_upload_to_missing_gallery_is_field_error() {
    let app = setup_app().await;

    let result = app
        .state
        .media_service
        .create_group(standalone(Some("missing".to_string()), png(10, 10)), ACTOR)
        .await;

    match result {
        Err(AppError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("gallery_id"))
        }
        other => panic!("expected validation error, got {:?}", other.map(|g| g.len())),
    }
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn test_soft_delete_keeps_media_rows_and_files() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, None).await;

    app.state
        .gallery_service
        .delete(&gallery_id, ACTOR)
        .await
        .unwrap();

    let gallery = Galleries::find_by_id(gallery_id.clone())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(gallery.deleted_at.is_some());

    let rows = MediaVariants::find()
        .filter(media_variants::Column::OwnerId.eq(&gallery_id))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(app.storage.contains(&row.storage_path));
    }

    let detail = app.state.catalog.load_detail(&gallery_id).await;
    assert!(matches!(detail, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_gallery_listing_sees_writes_after_cache_bump() {
    let app = setup_app().await;
    bare_gallery(&app, "First").await;

    let before = app
        .state
        .catalog
        .paginate(GalleryFilters::default())
        .await
        .unwrap();
    assert_eq!(before.total, 1);

    bare_gallery(&app, "Second").await;
    let after = app
        .state
        .catalog
        .paginate(GalleryFilters::default())
        .await
        .unwrap();
    assert_eq!(after.total, 2);
}

#[tokio::test]
async fn test_duplicate_titles_get_distinct_slugs() {
    let app = setup_app().await;
    bare_gallery(&app, "Summer Trip").await;
    let second = bare_gallery(&app, "Summer Trip").await;

    let gallery = Galleries::find_by_id(second)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(gallery.slug, "summer-trip-2");
}

async fn selected_rows(app: &TestApp, gallery_id: &str) -> Vec<media_variants::Model> {
    MediaVariants::find()
        .filter(media_variants::Column::OwnerId.eq(gallery_id))
        .filter(media_variants::Column::IsSelectedCover.eq(true))
        .all(&app.db)
        .await
        .unwrap()
}

fn broken_png() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(b"this is not an image body");
    bytes
}

#[tokio::test]
async fn test_cover_upload_leaves_selected_standalone_media_alone() {
    let app = setup_app().await;
    let gallery_id = gallery_with_cover(&app, None).await;
    let old_cover = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap()
        .remove(0);

    let photo = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), png(640, 480)), ACTOR)
        .await
        .unwrap();
    app.state
        .media_service
        .set_selected_cover(&gallery_id, &photo[0].id, ACTOR)
        .await
        .unwrap();

    app.state
        .gallery_service
        .update(
            &gallery_id,
            GalleryChanges::default(),
            Some(cover(jpeg(800, 600), None)),
            ACTOR,
        )
        .await
        .unwrap();

    let photo_rows = MediaRepository::find_group(&app.db, &photo[0].group_key)
        .await
        .unwrap();
    assert_eq!(photo_rows.len(), 3);
    for row in &photo_rows {
        assert!(app.storage.contains(&row.storage_path));
        assert_eq!(row.origin, MediaOrigin::Standalone);
    }
    for row in &old_cover {
        assert!(!app.storage.contains(&row.storage_path));
    }

    let groups = MediaRepository::groups_for_owner(&app.db, &gallery_id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    let new_cover = groups
        .iter()
        .find(|group| group[0].origin == MediaOrigin::Cover)
        .unwrap();
    assert_ne!(new_cover[0].group_key, old_cover[0].group_key);

    let selected = selected_rows(&app, &gallery_id).await;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].group_key, new_cover[0].group_key);
    assert_eq!(item_count(&app, &gallery_id).await, 1);
}

#[tokio::test]
async fn test_failed_cover_update_changes_nothing() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Old").await;

    let cached = app.state.catalog.get_by_id(&gallery_id).await.unwrap();
    assert_eq!(cached.summary.title, "Old");

    let result = app
        .state
        .gallery_service
        .update(
            &gallery_id,
            GalleryChanges {
                title: Some("New".to_string()),
                ..Default::default()
            },
            Some(cover(broken_png(), None)),
            ACTOR,
        )
        .await;
    assert!(matches!(result, Err(AppError::MediaProcessing(_))));

    let stored = Galleries::find_by_id(gallery_id.clone())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Old");
    let detail = app.state.catalog.get_by_id(&gallery_id).await.unwrap();
    assert_eq!(detail.summary.title, stored.title);
    assert!(app.storage.keys().is_empty());

    // A later successful update is visible through the cache
    app.state
        .gallery_service
        .update(
            &gallery_id,
            GalleryChanges {
                title: Some("New".to_string()),
                ..Default::default()
            },
            None,
            ACTOR,
        )
        .await
        .unwrap();
    let detail = app.state.catalog.get_by_id(&gallery_id).await.unwrap();
    assert_eq!(detail.summary.title, "New");
}

#[tokio::test]
async fn test_reassign_skips_files_that_are_already_gone() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Target").await;

    let group = app
        .state
        .media_service
        .create_group(standalone(None, png(640, 480)), ACTOR)
        .await
        .unwrap();
    let missing = variant(&group, VariantKind::Thumbnail);
    app.storage.remove(&missing.storage_path);

    let moved = app
        .state
        .media_service
        .reassign_owner(&group[0].group_key, Some(gallery_id.clone()), ACTOR)
        .await
        .unwrap();

    assert_eq!(moved.len(), 3);
    let prefix = format!("galleries/{}/", gallery_id);
    for row in &moved {
        assert_eq!(row.owner_id.as_deref(), Some(gallery_id.as_str()));
        if row.id == missing.id {
            assert_eq!(row.storage_path, missing.storage_path);
        } else {
            assert!(row.storage_path.starts_with(&prefix));
            assert!(app.storage.contains(&row.storage_path));
        }
    }
    assert_eq!(item_count(&app, &gallery_id).await, 1);
}

#[tokio::test]
async fn test_storage_failure_midway_removes_written_files() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Flaky").await;
    app.storage.fail_uploads_after(1);

    let result = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), png(640, 480)), ACTOR)
        .await;

    assert!(result.is_err());
    assert!(app.storage.keys().is_empty());
    assert_eq!(MediaVariants::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(item_count(&app, &gallery_id).await, 0);
}

#[tokio::test]
async fn test_rejected_rows_remove_written_files() {
    let app = setup_app().await;
    let gallery_id = bare_gallery(&app, "Locked").await;
    app.db
        .execute_unprepared(
            "CREATE TRIGGER reject_variants BEFORE INSERT ON media_variants \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .await
        .unwrap();

    let result = app
        .state
        .media_service
        .create_group(standalone(Some(gallery_id.clone()), png(640, 480)), ACTOR)
        .await;

    assert!(result.is_err());
    assert!(app.storage.keys().is_empty());
    assert_eq!(MediaVariants::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(item_count(&app, &gallery_id).await, 0);
}

#[tokio::test]
async fn test_moving_the_selected_cover_hands_covers_over() {
    let app = setup_app().await;
    let source = gallery_with_cover(&app, None).await;
    let cover_group = MediaRepository::groups_for_owner(&app.db, &source)
        .await
        .unwrap()
        .remove(0);
    let target = bare_gallery(&app, "Target").await;

    let photo = app
        .state
        .media_service
        .create_group(standalone(Some(source.clone()), png(640, 480)), ACTOR)
        .await
        .unwrap();
    app.state
        .media_service
        .set_selected_cover(&source, &photo[0].id, ACTOR)
        .await
        .unwrap();

    app.state
        .media_service
        .reassign_owner(&photo[0].group_key, Some(target.clone()), ACTOR)
        .await
        .unwrap();

    // The source falls back to its cover upload
    let selected = selected_rows(&app, &source).await;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].group_key, cover_group[0].group_key);

    // The target had no cover, so it adopts the moved group
    let selected = selected_rows(&app, &target).await;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].group_key, photo[0].group_key);
    assert_eq!(selected[0].variant_kind, VariantKind::Large);
}
