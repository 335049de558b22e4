use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_images_are_listed_in_position_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    db.record_segment_request("work", "1", "c").await.unwrap();

    for position in [10u32, 2, 1, 11] {
        db.record_image("work", "1", position, &format!("/staging/{position}.jpg"))
            .await
            .unwrap();
    }

    let positions: Vec<i64> = db
        .list_images("work", "1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 10, 11]);
}

#[tokio::test]
async fn test_duplicate_position_overwrites() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    db.record_segment_request("work", "1", "c").await.unwrap();

    db.record_image("work", "1", 0, "/old/0.jpg").await.unwrap();
    db.record_image("work", "1", 0, "/new/0.jpg").await.unwrap();

    let images = db.list_images("work", "1").await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].local_path, "/new/0.jpg");
}

#[tokio::test]
async fn test_images_are_scoped_to_their_segment() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    db.record_segment_request("work", "1", "c").await.unwrap();
    db.record_segment_request("work", "2", "c").await.unwrap();

    db.record_image("work", "1", 0, "/a/0.jpg").await.unwrap();
    db.record_image("work", "2", 0, "/b/0.jpg").await.unwrap();
    db.record_image("work", "2", 1, "/b/1.jpg").await.unwrap();

    assert_eq!(db.list_images("work", "1").await.unwrap().len(), 1);
    assert_eq!(db.list_images("work", "2").await.unwrap().len(), 2);
    assert!(db.list_images("work", "3").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_image_without_segment_record_is_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let result = db.record_image("orphan", "1", 0, "/x/0.jpg").await;
    assert!(result.is_err(), "foreign key must reject orphan image records");
}
