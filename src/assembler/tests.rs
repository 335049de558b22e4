use super::*;
use image::RgbImage;
use lopdf::Document;
use std::sync::Mutex;
use tempfile::TempDir;

/// Records the page order it was handed and writes a placeholder file
#[derive(Default)]
struct RecordingRenderer {
    seen: Mutex<Vec<u32>>,
}

impl PageRenderer for RecordingRenderer {
    fn render(&self, pages: &[StagedImage], output: &Path) -> Result<usize, AssemblyError> {
        self.seen
            .lock()
            .unwrap()
            .extend(pages.iter().map(|p| p.position));
        std::fs::write(output, b"doc").unwrap();
        Ok(pages.len())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct FailingRenderer;

impl PageRenderer for FailingRenderer {
    fn render(&self, pages: &[StagedImage], _output: &Path) -> Result<usize, AssemblyError> {
        Err(AssemblyError::Render {
            path: pages[0].path.clone(),
            reason: "corrupt image".into(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

async fn staging_with(dir: &TempDir, positions: &[u32]) -> StagingArea {
    let staging = StagingArea::create_unique(&dir.path().join("staging"), "work-1")
        .await
        .unwrap();
    for &position in positions {
        tokio::fs::write(staging.page_path(position, "jpg"), b"x")
            .await
            .unwrap();
    }
    staging
}

/// Writes a PNG whose width encodes its position
async fn staging_with_images(dir: &TempDir, positions: &[u32]) -> StagingArea {
    let staging = StagingArea::create_unique(&dir.path().join("staging"), "work-1")
        .await
        .unwrap();
    for &position in positions {
        let image = RgbImage::from_pixel(10 + position, 20, image::Rgb([200, 40, 40]));
        image.save(staging.page_path(position, "png")).unwrap();
    }
    staging
}

fn media_box_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

#[tokio::test]
async fn pages_are_ordered_numerically_not_lexicographically() {
    let dir = TempDir::new().unwrap();
    let positions: Vec<u32> = (1..=11).collect();
    let staging = staging_with(&dir, &positions).await;

    let renderer = Arc::new(RecordingRenderer::default());
    let assembler = DocumentAssembler::new(dir.path().join("docs"), renderer.clone());

    let document = assembler.assemble(staging, "Title").await.unwrap();

    assert_eq!(document.pages, 11);
    assert_eq!(*renderer.seen.lock().unwrap(), positions);
}

#[tokio::test]
async fn empty_staging_is_an_error() {
    let dir = TempDir::new().unwrap();
    let staging = staging_with(&dir, &[]).await;
    let staging_path = staging.path().to_path_buf();

    let assembler = DocumentAssembler::new(
        dir.path().join("docs"),
        Arc::new(RecordingRenderer::default()),
    );

    let result = assembler.assemble(staging, "Title").await;
    assert!(matches!(result, Err(AssemblyError::EmptyStaging { .. })));
    assert!(!assembler.document_path("Title").exists());
    assert!(staging_path.exists());
}

#[tokio::test]
async fn success_writes_sanitized_document_and_removes_staging() {
    let dir = TempDir::new().unwrap();
    let staging = staging_with(&dir, &[0, 1, 2]).await;
    let staging_path = staging.path().to_path_buf();

    let assembler = DocumentAssembler::new(
        dir.path().join("docs"),
        Arc::new(RecordingRenderer::default()),
    );

    let document = assembler.assemble(staging, "Example Title").await.unwrap();

    assert_eq!(document.path, dir.path().join("docs").join("Example_Title.pdf"));
    assert!(document.path.exists());
    assert!(!staging_path.exists());

    // No temporary files are left beside the document
    let mut entries = tokio::fs::read_dir(dir.path().join("docs")).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    assert_eq!(names, vec!["Example_Title.pdf".to_string()]);
}

#[tokio::test]
async fn renderer_failure_keeps_staging_and_previous_document() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("docs");
    tokio::fs::create_dir_all(&docs).await.unwrap();
    tokio::fs::write(docs.join("Title.pdf"), b"previous")
        .await
        .unwrap();

    let staging = staging_with(&dir, &[0, 1]).await;
    let staging_path = staging.path().to_path_buf();
    let assembler = DocumentAssembler::new(&docs, Arc::new(FailingRenderer));

    let result = assembler.assemble(staging, "Title").await;

    assert!(matches!(result, Err(AssemblyError::Render { .. })));
    assert!(staging_path.join("0.jpg").exists());
    assert_eq!(
        tokio::fs::read(docs.join("Title.pdf")).await.unwrap(),
        b"previous".to_vec()
    );
}

#[tokio::test]
async fn pdf_pages_follow_position_order() {
    let dir = TempDir::new().unwrap();
    let positions: Vec<u32> = (1..=11).collect();
    let staging = staging_with_images(&dir, &positions).await;

    let assembler = DocumentAssembler::new(dir.path().join("docs"), Arc::new(PdfRenderer::new()));
    let document = assembler.assemble(staging, "Numbered").await.unwrap();

    assert_eq!(document.pages, 11);
    let expected: Vec<i64> = positions.iter().map(|&p| i64::from(10 + p)).collect();
    assert_eq!(media_box_widths(&document.path), expected);
}

#[tokio::test]
async fn pdf_rerun_overwrites_document() {
    let dir = TempDir::new().unwrap();
    let assembler = DocumentAssembler::new(dir.path().join("docs"), Arc::new(PdfRenderer::new()));

    let first = staging_with_images(&dir, &[0, 1, 2]).await;
    assembler.assemble(first, "Same Title").await.unwrap();

    let second = staging_with_images(&dir, &[0]).await;
    let document = assembler.assemble(second, "Same Title").await.unwrap();

    assert_eq!(media_box_widths(&document.path), vec![10]);
}

#[tokio::test]
async fn undecodable_image_fails_rendering() {
    let dir = TempDir::new().unwrap();
    let staging = staging_with(&dir, &[0]).await;

    let assembler = DocumentAssembler::new(dir.path().join("docs"), Arc::new(PdfRenderer::new()));
    let result = assembler.assemble(staging, "Broken").await;

    assert!(matches!(result, Err(AssemblyError::Render { .. })));
}
