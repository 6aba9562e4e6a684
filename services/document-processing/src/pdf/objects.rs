//! Small lookups over the lopdf object graph shared by reading and writing.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Follow indirect references, giving up after a few hops on cycles.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..8 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree when it is inherited.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node: &Dictionary = doc.get_object(page_id).ok()?.as_dict().ok()?;

    for _ in 0..32 {
        if let Some(value) = dict_get(doc, node, key) {
            return Some(value);
        }
        node = match dict_get(doc, node, b"Parent")? {
            Object::Dictionary(parent) => parent,
            _ => return None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_inherited_walks_parents() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Rotate" => Object::Integer(90),
            }),
        );

        let rotate = inherited(&doc, page_id, b"Rotate").and_then(number);
        assert_eq!(rotate, Some(90.0));
        assert!(inherited(&doc, page_id, b"CropBox").is_none());
    }
}
