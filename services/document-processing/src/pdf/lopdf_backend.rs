use integra_models::{PageSize, PageText, Rect, Word};
use integra_utils::{StatementError, StatementResult};
use lopdf::{Document, Object, ObjectId};

use super::objects::{inherited, number};
use super::render::DocumentWriter;
use super::text::extract_words;
use super::{PdfBackend, RenderPage, SourceDocument};

/// US Letter, used when a page declares no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

#[derive(Debug, Clone, Copy)]
struct PageEntry {
    /// 1-based page number as keyed by `get_pages`.
    number: u32,
    id: ObjectId,
    media_box: [f64; 4],
}

/// A source PDF decoded with `lopdf`.
#[derive(Debug)]
pub struct LopdfDocument {
    name: String,
    document: Document,
    pages: Vec<PageEntry>,
}

impl LopdfDocument {
    fn entry(&self, page_index: usize) -> StatementResult<PageEntry> {
        self.pages.get(page_index).copied().ok_or_else(|| {
            StatementError::internal(format!(
                "Page {} out of range for '{}' ({} pages)",
                page_index,
                self.name,
                self.pages.len()
            ))
        })
    }
}

fn media_box(document: &Document, page_id: ObjectId) -> [f64; 4] {
    let Some(Object::Array(values)) = inherited(document, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };

    let numbers: Vec<f64> = values.iter().filter_map(number).collect();
    match numbers.as_slice() {
        [x0, y0, x1, y1] if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => {
            [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)]
        }
        _ => DEFAULT_MEDIA_BOX,
    }
}

impl SourceDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> StatementResult<PageText> {
        let entry = self.entry(page_index)?;
        let [llx, lly, urx, ury] = entry.media_box;

        let raw = extract_words(&self.document, entry.number).map_err(|e| {
            StatementError::document_open(&self.name, format!("page {}: {}", page_index + 1, e))
        })?;

        let words = raw
            .into_iter()
            .map(|word| {
                // flip into the top-left origin
                let bbox = Rect::new(word.x0 - llx, ury - word.y1, word.x1 - llx, ury - word.y0);
                Word::new(word.text, bbox, page_index)
            })
            .collect();

        Ok(PageText {
            page_index,
            size: PageSize::new(urx - llx, ury - lly),
            words,
        })
    }
}

/// [`PdfBackend`] built on `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;

    fn open(&self, name: &str, bytes: &[u8]) -> StatementResult<LopdfDocument> {
        let document =
            Document::load_mem(bytes).map_err(|e| StatementError::document_open(name, e.to_string()))?;

        let pages: Vec<PageEntry> = document
            .get_pages()
            .into_iter()
            .map(|(number, id)| PageEntry {
                number,
                id,
                media_box: media_box(&document, id),
            })
            .collect();

        if pages.is_empty() {
            return Err(StatementError::document_open(name, "document has no pages"));
        }

        tracing::debug!(file = name, pages = pages.len(), "PDF decoded");

        Ok(LopdfDocument {
            name: name.to_string(),
            document,
            pages,
        })
    }

    fn render(&self, unit: &str, pages: &[RenderPage<'_, LopdfDocument>]) -> StatementResult<Vec<u8>> {
        let mut writer = DocumentWriter::new();

        for page in pages {
            let entry = page.document.entry(page.page_index)?;
            writer
                .add_page(
                    page.file_index,
                    &page.document.document,
                    entry.id,
                    entry.media_box,
                    page.annotations,
                )
                .map_err(|e| {
                    StatementError::rendering(
                        unit,
                        format!("{} page {}: {}", page.document.name, page.page_index + 1, e),
                    )
                })?;
        }

        writer
            .finish()
            .map_err(|e| StatementError::rendering(unit, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use integra_models::{OverlayKind, OverlayStyle};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// Single A4 page showing each `(x, y, text)` with Helvetica 12.
    fn build_pdf(lines: &[(i64, i64, &str)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = Vec::new();
        for (x, y, text) in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]));
            operations.push(Operation::new("Td", vec![Object::Integer(*x), Object::Integer(*y)]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_words_extracted_with_top_left_boxes() {
        let bytes = build_pdf(&[(100, 700, "1234567890 Salary"), (100, 100, "Page 1")]);
        let document = LopdfBackend::new().open("march.pdf", &bytes).unwrap();
        assert_eq!(document.page_count(), 1);

        let page = document.page_text(0).unwrap();
        assert_eq!(page.size, PageSize::new(595.0, 842.0));

        let texts: Vec<&str> = page.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["1234567890", "Salary", "Page", "1"]);

        let id = &page.words[0];
        assert!((id.bbox.x0 - 100.0).abs() < 1e-6);
        // baseline at 700 from the bottom, ascent 0.8 em
        assert!((id.bbox.y0 - (842.0 - 709.6)).abs() < 1e-6);
        assert!(id.bbox.y1 > id.bbox.y0);
        assert!(page.words[2].bbox.y0 > id.bbox.y1);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let err = LopdfBackend::new().open("broken.pdf", b"not a pdf").unwrap_err();
        assert_eq!(err.error_code(), "DOCUMENT_OPEN_ERROR");
        assert!(err.to_string().contains("broken.pdf"));
    }

    #[test]
    fn test_render_stamps_annotations() {
        let bytes = build_pdf(&[(100, 700, "1234567890")]);
        let backend = LopdfBackend::new();
        let document = backend.open("march.pdf", &bytes).unwrap();
        let page = document.page_text(0).unwrap();

        let annotation = OverlayStyle::HIGHLIGHT
            .stamp(page.words[0].bbox, OverlayKind::Highlight)
            .unwrap();
        let annotations = [annotation];
        let rendered = backend
            .render(
                "A12",
                &[
                    RenderPage { file_index: 0, document: &document, page_index: 0, annotations: &annotations },
                    RenderPage { file_index: 0, document: &document, page_index: 0, annotations: &[] },
                ],
            )
            .unwrap();

        let output = Document::load_mem(&rendered).unwrap();
        let pages = output.get_pages();
        assert_eq!(pages.len(), 2);

        let first = output.get_object(pages[&1]).unwrap().as_dict().unwrap();
        let annots = first.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 1);
        let annot = output
            .get_object(annots[0].as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(annot.get(b"Subtype").unwrap().as_name().unwrap(), b"Square");
        assert_eq!(annot.get(b"F").unwrap().as_i64().unwrap(), 68);

        let second = output.get_object(pages[&2]).unwrap().as_dict().unwrap();
        assert!(second.get(b"Annots").is_err());

        // the copy is still readable text
        let reopened = backend.open("A12.pdf", &rendered).unwrap();
        let words = reopened.page_text(1).unwrap().words;
        assert_eq!(words[0].text, "1234567890");
    }

    #[test]
    fn test_render_keeps_files_apart() {
        // identical object layouts, so shared ids must be kept per file
        let backend = LopdfBackend::new();
        let march = backend.open("march.pdf", &build_pdf(&[(100, 700, "1111111111")])).unwrap();
        let april = backend.open("april.pdf", &build_pdf(&[(100, 700, "2222222222")])).unwrap();

        let rendered = backend
            .render(
                "A12",
                &[
                    RenderPage { file_index: 0, document: &march, page_index: 0, annotations: &[] },
                    RenderPage { file_index: 1, document: &april, page_index: 0, annotations: &[] },
                ],
            )
            .unwrap();

        let output = backend.open("A12.pdf", &rendered).unwrap();
        assert_eq!(output.page_text(0).unwrap().words[0].text, "1111111111");
        assert_eq!(output.page_text(1).unwrap().words[0].text, "2222222222");
    }

    /// Single A4 page whose only content is `/X1 Do`; the form draws `text`.
    fn build_form_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let form_content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(10)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            },
            form_content.encode().unwrap(),
        ));

        let page_content = Content {
            operations: vec![Operation::new("Do", vec!["X1".into()])],
        };
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), page_content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "X1" => form_id },
            },
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_form_xobject_text_extracted() {
        let bytes = build_form_pdf("1234567890");
        let document = LopdfBackend::new().open("form.pdf", &bytes).unwrap();

        let page = document.page_text(0).unwrap();
        let texts: Vec<&str> = page.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["1234567890"]);
        assert!((page.words[0].bbox.x0 - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_page_numbers_follow_page_tree() {
        let bytes = build_pdf(&[(100, 700, "1")]);
        let document = LopdfBackend::new().open("one.pdf", &bytes).unwrap();
        assert_eq!(document.pages[0].number, 1);
        assert!(document.page_text(1).is_err());
    }
}
