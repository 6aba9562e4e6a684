//! Output document assembly: page copies plus square overlay annotations.

use std::collections::HashMap;

use integra_models::Annotation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::objects::inherited;

/// Page attributes a child page may inherit from the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page keys that point back into the source structure and are not copied.
const DROPPED_PAGE_KEYS: [&[u8]; 4] = [b"Parent", b"Annots", b"B", b"StructParents"];

/// Annotation flags: Print (4) and ReadOnly (64).
const FLAG_PRINT: i64 = 4;
const FLAG_READ_ONLY: i64 = 64;

/// Builds one output document from pages of any number of source documents.
pub(crate) struct DocumentWriter {
    out: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// Object id translation per source file, keyed by file index.
    copied: HashMap<usize, HashMap<ObjectId, ObjectId>>,
}

impl DocumentWriter {
    pub(crate) fn new() -> Self {
        let mut out = Document::with_version("1.5");
        let pages_id = out.new_object_id();
        Self {
            out,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
        }
    }

    fn mapped(&self, file_index: usize, id: &ObjectId) -> Option<ObjectId> {
        self.copied.get(&file_index).and_then(|ids| ids.get(id)).copied()
    }

    /// Deep-copy `obj` from `source`, allocating fresh ids for referenced objects.
    fn copy_object(&mut self, source: &Document, file_index: usize, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => {
                if let Some(mapped) = self.mapped(file_index, id) {
                    return Object::Reference(mapped);
                }
                let new_id = self.out.new_object_id();
                self.copied.entry(file_index).or_default().insert(*id, new_id);
                let copy = match source.get_object(*id) {
                    Ok(target) => self.copy_object(source, file_index, target),
                    Err(_) => Object::Null,
                };
                self.out.objects.insert(new_id, copy);
                Object::Reference(new_id)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(source, file_index, dict, &[b"Parent"])),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, file_index, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dict(source, file_index, &stream.dict, &[b"Parent"]);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dict(&mut self, source: &Document, file_index: usize, dict: &Dictionary, skip: &[&[u8]]) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if skip.contains(&key.as_slice()) {
                continue;
            }
            copy.set(key.clone(), self.copy_object(source, file_index, value));
        }
        copy
    }

    /// Append page `page_id` of `source` with `annotations` stamped on top.
    ///
    /// `file_index` identifies `source`; objects shared between its pages are
    /// copied once.
    ///
    /// `media_box` is the page's effective `[llx, lly, urx, ury]`, used to map
    /// the top-left annotation rectangles back into PDF space.
    pub(crate) fn add_page(
        &mut self,
        file_index: usize,
        source: &Document,
        page_id: ObjectId,
        media_box: [f64; 4],
        annotations: &[Annotation],
    ) -> Result<(), lopdf::Error> {
        let page = source.get_object(page_id)?.as_dict()?;

        let mut copy = self.copy_dict(source, file_index, page, &DROPPED_PAGE_KEYS);
        for key in INHERITABLE {
            if copy.get(key).is_err() {
                if let Some(value) = inherited(source, page_id, key) {
                    let value = self.copy_object(source, file_index, value);
                    copy.set(key.to_vec(), value);
                }
            }
        }

        if !annotations.is_empty() {
            let annots: Vec<Object> = annotations
                .iter()
                .map(|annotation| Object::Reference(self.add_annotation(annotation, media_box)))
                .collect();
            copy.set("Annots", Object::Array(annots));
        }
        copy.set("Parent", Object::Reference(self.pages_id));

        let new_page_id = self.out.add_object(copy);
        self.kids.push(Object::Reference(new_page_id));
        Ok(())
    }

    fn add_annotation(&mut self, annotation: &Annotation, media_box: [f64; 4]) -> ObjectId {
        let [llx, _, _, ury] = media_box;
        let rect = annotation.rect;
        let (x0, y0, x1, y1) = (rect.x0 + llx, ury - rect.y1, rect.x1 + llx, ury - rect.y0);
        let (width, height) = (x1 - x0, y1 - y0);

        let fill = color_array(annotation.fill.components());
        let stroke = color_array(annotation.stroke.components());
        let [fr, fg, fb] = annotation.fill.components();
        let [sr, sg, sb] = annotation.stroke.components();
        let bw = annotation.border_width;
        let half = bw / 2.0;

        let appearance = format!(
            "q /GS0 gs {fr} {fg} {fb} rg {sr} {sg} {sb} RG {bw} w {half} {half} {w} {h} re B Q",
            w = (width as f32 - bw).max(0.0),
            h = (height as f32 - bw).max(0.0),
        );
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(width as f32),
                    Object::Real(height as f32),
                ],
                "Resources" => dictionary! {
                    "ExtGState" => dictionary! {
                        "GS0" => dictionary! {
                            "Type" => "ExtGState",
                            "ca" => Object::Real(annotation.opacity),
                            "CA" => Object::Real(annotation.opacity),
                        },
                    },
                },
            },
            appearance.into_bytes(),
        );
        let form_id = self.out.add_object(form);

        let mut flags = FLAG_PRINT;
        if annotation.read_only {
            flags |= FLAG_READ_ONLY;
        }

        self.out.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![
                Object::Real(x0 as f32),
                Object::Real(y0 as f32),
                Object::Real(x1 as f32),
                Object::Real(y1 as f32),
            ],
            "C" => stroke,
            "IC" => fill,
            "CA" => Object::Real(annotation.opacity),
            "BS" => dictionary! { "W" => Object::Real(bw) },
            "F" => Object::Integer(flags),
            "AP" => dictionary! { "N" => Object::Reference(form_id) },
        })
    }

    /// Close the page tree and serialize.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>, lopdf::Error> {
        let count = self.kids.len() as i64;
        self.out.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => Object::Integer(count),
            }),
        );

        let catalog_id = self.out.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.out.trailer.set("Root", Object::Reference(catalog_id));
        self.out.compress();

        let mut bytes = Vec::new();
        self.out.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn color_array(components: [f32; 3]) -> Vec<Object> {
    components.iter().map(|c| Object::Real(*c)).collect()
}
