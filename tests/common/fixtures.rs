//! A fake reader site served by wiremock

use std::io::Cursor;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// PNG of the given size, filled with one colour
pub fn png_page(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Reader page markup with `title` and one page image per `(position, src)`,
/// in the order given
pub fn reader_page_html(title: &str, pages: &[(u32, String)]) -> String {
    let images: String = pages
        .iter()
        .map(|(position, src)| {
            format!(
                "    <img class=\"page-image lazy\" data-index=\"{}\" src=\"{}\" alt=\"page\">\n",
                position, src
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Reader</title></head>\n<body>\n  \
         <h1 class=\"entry-title\">{}</h1>\n  <div id=\"reader\">\n{}  </div>\n  \
         <img class=\"site-logo\" src=\"/logo.png\">\n</body>\n</html>\n",
        title, images
    )
}

/// Mount a reader page for `work`/`segment` whose pages are listed in
/// `listing_order`; page `p` is served at `/img/<work>/<p>.png` and is
/// `10 + p` pixels wide
pub async fn mount_segment(
    server: &MockServer,
    work: &str,
    segment: &str,
    title: &str,
    listing_order: &[u32],
) {
    let mut pages = Vec::new();
    for &position in listing_order {
        let image_path = format!("/img/{}/{}.png", work, position);
        Mock::given(method("GET"))
            .and(path(image_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_page(10 + position, 20)))
            .mount(server)
            .await;
        // Relative sources are resolved against the reader page URL
        pages.push((position, image_path));
    }

    Mock::given(method("GET"))
        .and(path(format!("/read/{}/{}", work, segment)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(reader_page_html(title, &pages)),
        )
        .mount(server)
        .await;
}

/// Number of requests the site received for `path_prefix`
pub async fn requests_to(server: &MockServer, path_prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path().starts_with(path_prefix))
        .count()
}
