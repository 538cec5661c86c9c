//! Deep page copies between documents
//!
//! A cloned page gets a brand new page dictionary with its inherited
//! attributes (`Resources`, `MediaBox`, `CropBox`, `Rotate`) resolved onto it.
//! Everything the page references is copied into the target document with
//! fresh object ids, so later rotation or overlay work on the clone can never
//! reach the source.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Result;

/// Page attributes a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page dictionary keys that must not be followed when copying
///
/// `Parent` points back into the source page tree and `B` into its article
/// threads; the target document builds its own.
const SKIPPED_KEYS: [&[u8]; 2] = [b"Parent", b"B"];

/// Look up a page attribute, walking up the `Parent` chain if needed
pub fn resolve_inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound only guards against Parent cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        }
    }
    None
}

/// Follow a reference to the object it points at
pub fn dereference<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Read a PDF number as `f32`
pub fn object_to_f32(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Copies pages and objects from one source document into one target
///
/// Objects other than page dictionaries are copied once per cloner and then
/// shared by every page cloned through it. Those shared objects (fonts,
/// images, content streams) are never mutated downstream; overlays only ever
/// replace entries on the page dictionary itself.
#[derive(Debug, Default)]
pub struct PageCloner {
    id_map: HashMap<ObjectId, ObjectId>,
}

impl PageCloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone page `page_id` of `source` into `target`
    ///
    /// Returns the id of the new page dictionary. The page has no `Parent`;
    /// the caller attaches it to a page tree.
    pub fn clone_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        target: &mut Document,
    ) -> Result<ObjectId> {
        let page = source.get_dictionary(page_id)?;
        let new_page_id = target.new_object_id();

        // Annotations refer back to their page through /P; map it to the clone
        // only for the duration of this copy so the page itself is never shared
        let previous = self.id_map.insert(page_id, new_page_id);

        let mut new_page = Dictionary::new();
        for (key, value) in page.iter() {
            if SKIPPED_KEYS.contains(&key.as_slice()) {
                continue;
            }
            new_page.set(key.clone(), self.import_object(source, value, target)?);
        }

        for key in INHERITABLE {
            if new_page.has(key) {
                continue;
            }
            if let Some(value) = resolve_inherited(source, page_id, key) {
                let value = value.clone();
                new_page.set(key.to_vec(), self.import_object(source, &value, target)?);
            }
        }

        match previous {
            Some(id) => self.id_map.insert(page_id, id),
            None => self.id_map.remove(&page_id),
        };

        target.objects.insert(new_page_id, Object::Dictionary(new_page));
        Ok(new_page_id)
    }

    /// Copy `object` into `target`, remapping every reference it contains
    pub fn import_object(
        &mut self,
        source: &Document,
        object: &Object,
        target: &mut Document,
    ) -> Result<Object> {
        Ok(match object {
            Object::Reference(id) => Object::Reference(self.import_reference(source, *id, target)?),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(source, item, target))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(source, dict, target)?),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dictionary(source, &stream.dict, target)?;
                Object::Stream(copy)
            }
            other => other.clone(),
        })
    }

    fn import_dictionary(
        &mut self,
        source: &Document,
        dict: &Dictionary,
        target: &mut Document,
    ) -> Result<Dictionary> {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.import_object(source, value, target)?);
        }
        Ok(copy)
    }

    fn import_reference(
        &mut self,
        source: &Document,
        id: ObjectId,
        target: &mut Document,
    ) -> Result<ObjectId> {
        if let Some(&new_id) = self.id_map.get(&id) {
            return Ok(new_id);
        }

        // Reserve the id before recursing so reference cycles terminate
        let new_id = target.new_object_id();
        self.id_map.insert(id, new_id);

        let copied = match source.get_object(id) {
            Ok(object) => self.import_object(source, object, target)?,
            // Dangling references resolve to null (ISO 32000-1, 7.3.10)
            Err(_) => Object::Null,
        };
        target.objects.insert(new_id, copied);
        Ok(new_id)
    }
}
