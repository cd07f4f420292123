//! PDF rendering of the aggregated shopping list.

use std::{
    fmt::{self, Display},
    fs,
    io::Cursor,
    path::Path,
    sync::Arc,
};

use printpdf::{IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use warp::http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::{
    config::Config,
    constants::{SHOPPING_LIST_FILENAME, SHOPPING_LIST_MIME_TYPE},
    error::CoreError,
    schema::ShoppingListLine,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 25.4;
const LINE_SPACING: f32 = 1.2;
const MM_PER_POINT: f32 = 25.4 / 72.0;
const LAYER: &str = "Shopping list";

/// Unicode fallback face, so non-Latin ingredient names render without a
/// configured font.
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

impl Display for ShoppingListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.name, self.amount, self.measurement_unit)
    }
}

/// A downloadable file.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

impl warp::Reply for Document {
    fn into_response(self) -> warp::reply::Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let mut response = warp::reply::Response::new(self.bytes.into());
        let headers = response.headers_mut();

        if let Ok(value) = HeaderValue::from_str(&self.mime_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(CONTENT_DISPOSITION, value);
        }

        response
    }
}

#[derive(Clone)]
enum ShoppingListFont {
    Embedded(&'static [u8]),
    External(Arc<Vec<u8>>),
}

impl ShoppingListFont {
    fn bytes(&self) -> &[u8] {
        match self {
            ShoppingListFont::Embedded(bytes) => bytes,
            ShoppingListFont::External(bytes) => bytes.as_slice(),
        }
    }
}

/// Renders shopping lists on A4 pages with one inch margins. Built once at
/// startup; the font file is read and parsed here, never per request.
#[derive(Clone)]
pub struct ShoppingListRenderer {
    font: ShoppingListFont,
    font_size: f32,
}

impl ShoppingListRenderer {
    pub fn new(font_path: Option<&Path>, font_size: f32) -> Result<Self, CoreError> {
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(CoreError::Fatal(format!("Invalid font size {font_size}")));
        }

        let font = match font_path {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| {
                    CoreError::Fatal(format!("Could not read font {}: {e}", path.display()))
                })?;

                PdfDocument::empty("font check")
                    .add_external_font(Cursor::new(bytes.as_slice()))
                    .map_err(|e| {
                        CoreError::Fatal(format!("Could not load font {}: {e}", path.display()))
                    })?;

                log::info!("Loaded shopping list font {}", path.display());
                ShoppingListFont::External(Arc::new(bytes))
            }
            None => ShoppingListFont::Embedded(DEFAULT_FONT),
        };

        Ok(Self { font, font_size })
    }

    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        Self::new(
            config.shopping_list_font.as_deref(),
            config.shopping_list_font_size,
        )
    }

    fn line_height(&self) -> f32 {
        self.font_size * LINE_SPACING * MM_PER_POINT
    }

    pub fn lines_per_page(&self) -> usize {
        let usable = PAGE_HEIGHT - 2.0 * MARGIN;
        ((usable / self.line_height()) as usize).max(1)
    }

    fn load_font(&self, doc: &PdfDocumentReference) -> Result<IndirectFontRef, printpdf::Error> {
        doc.add_external_font(Cursor::new(self.font.bytes()))
    }

    pub fn render(&self, lines: &[ShoppingListLine]) -> Result<Document, CoreError> {
        let text: Vec<String> = lines.iter().map(ToString::to_string).collect();
        let pages = paginate(&text, self.lines_per_page());

        let (doc, first_page, first_layer) =
            PdfDocument::new(LAYER, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let font = self.load_font(&doc).map_err(render_error)?;

        let first_baseline = PAGE_HEIGHT - MARGIN - self.font_size * MM_PER_POINT;
        for (index, page_lines) in pages.iter().enumerate() {
            let (page, layer) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER)
            };
            let layer = doc.get_page(page).get_layer(layer);

            for (row, line) in page_lines.iter().enumerate() {
                let y = first_baseline - row as f32 * self.line_height();
                layer.use_text(line.as_str(), self.font_size, Mm(MARGIN), Mm(y), &font);
            }
        }

        let bytes = doc.save_to_bytes().map_err(render_error)?;

        Ok(Document {
            bytes,
            mime_type: SHOPPING_LIST_MIME_TYPE.to_owned(),
            filename: SHOPPING_LIST_FILENAME.to_owned(),
        })
    }

    /// Runs `render` on the blocking pool.
    pub async fn render_async(&self, lines: Vec<ShoppingListLine>) -> Result<Document, CoreError> {
        let renderer = self.clone();

        tokio::task::spawn_blocking(move || renderer.render(&lines))
            .await
            .map_err(|e| CoreError::Fatal(format!("Renderer task failed: {e}")))?
    }
}

fn render_error(error: printpdf::Error) -> CoreError {
    CoreError::Fatal(format!("Could not render shopping list: {error}"))
}

/// Splits lines into pages; an empty list still yields one empty page.
pub fn paginate(lines: &[String], per_page: usize) -> Vec<&[String]> {
    if lines.is_empty() {
        let empty: &[String] = &[];
        return vec![empty];
    }

    lines.chunks(per_page.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, amount: i64, unit: &str) -> ShoppingListLine {
        ShoppingListLine {
            ingredient_id: 1,
            name: name.to_owned(),
            amount,
            measurement_unit: unit.to_owned(),
        }
    }

    #[test]
    fn formats_a_line() {
        assert_eq!(line("flour", 500, "g").to_string(), "flour: 500 g");
    }

    #[test]
    fn empty_list_is_one_page() {
        let pages = paginate(&[], 40);

        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn overflowing_lines_start_a_new_page() {
        let renderer = ShoppingListRenderer::new(None, 14.0).unwrap();
        let per_page = renderer.lines_per_page();
        let lines: Vec<String> = (0..per_page * 2 + 1).map(|i| i.to_string()).collect();

        let pages = paginate(&lines, per_page);

        assert_eq!(per_page, 41);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], &["82".to_owned()]);
    }

    #[test]
    fn renders_an_empty_list() {
        let renderer = ShoppingListRenderer::new(None, 14.0).unwrap();
        let document = renderer.render(&[]).unwrap();

        assert!(document.bytes.starts_with(b"%PDF"));
        assert_eq!(document.mime_type, "application/pdf");
        assert_eq!(document.filename, "your_shopping_cart.pdf");
    }

    #[test]
    fn default_font_embeds_cyrillic_glyphs() {
        let renderer = ShoppingListRenderer::new(None, 14.0).unwrap();
        let document = renderer.render(&[line("мука", 500, "г")]).unwrap();

        let contains = |needle: &[u8]| {
            document
                .bytes
                .windows(needle.len())
                .any(|window| window == needle)
        };
        assert!(document.bytes.starts_with(b"%PDF"));
        assert!(contains(b"FontFile2"));
        assert!(contains(b"Identity-H"));
        assert!(!contains(b"WinAnsiEncoding"));
    }

    #[test]
    fn missing_font_is_fatal() {
        let result = ShoppingListRenderer::new(Some(Path::new("/nonexistent/font.ttf")), 14.0);

        assert!(matches!(result, Err(CoreError::Fatal(_))));
    }

    #[test]
    fn garbage_font_is_fatal() {
        let path = std::env::temp_dir().join("foodgram_not_a_font.ttf");
        fs::write(&path, b"definitely not a font").unwrap();

        let result = ShoppingListRenderer::new(Some(&path), 14.0);

        assert!(matches!(result, Err(CoreError::Fatal(_))));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn reply_is_an_attachment() {
        use warp::Reply;

        let response = Document {
            bytes: b"%PDF-1.3".to_vec(),
            mime_type: "application/pdf".to_owned(),
            filename: "your_shopping_cart.pdf".to_owned(),
        }
        .into_response();

        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"your_shopping_cart.pdf\""
        );
    }
}
