use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use crate::error::{PullError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PullError::MissingResource(path.to_path_buf()));
        }
        let doc = Document::load(path).map_err(|e| PullError::UnreadableResource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(pages = doc.get_pages().len(), "PDF loaded");
        Ok(PdfDocument {
            doc,
            path: path.to_path_buf(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Build a new document holding copies of `pages` (1-based) in the given
    /// order. A page listed twice is copied twice.
    pub fn extract_pages(&self, pages: &[u32]) -> Result<Document> {
        let page_ids = self.doc.get_pages();
        let total = page_ids.len() as u32;

        let mut copier = PageCopier::new(&self.doc, new_document());
        let pages_id = pages_root(&copier.target)?;

        // Output pages get their ids up front so a link to a page copied
        // later still resolves.
        let mut plan = Vec::with_capacity(pages.len());
        for &page in pages {
            let source_id = *page_ids.get(&page).ok_or_else(|| PullError::OutOfRange {
                tokens: vec![page.to_string()],
                total,
            })?;
            let new_id = copier.target.new_object_id();
            copier.pages.entry(source_id).or_insert(new_id);
            plan.push((source_id, new_id));
        }

        for (source_id, new_id) in plan {
            self.copy_page(&mut copier, pages_id, source_id, new_id)?;
        }

        debug!(
            copied_pages = pages.len(),
            shared_objects = copier.copied.len(),
            "pages copied"
        );
        Ok(copier.target)
    }

    fn copy_page(
        &self,
        copier: &mut PageCopier<'_>,
        pages_id: ObjectId,
        page_id: ObjectId,
        new_page_id: ObjectId,
    ) -> Result<()> {
        let page = self.doc.get_dictionary(page_id).map_err(|e| {
            PullError::Format(format!("cannot read page object {:?}: {}", page_id, e))
        })?;

        let mut new_page = Dictionary::new();
        for (key, value) in page.iter() {
            if key == b"Parent" {
                continue;
            }
            new_page.set(key.clone(), copier.copy(value));
        }
        for key in INHERITABLE {
            if new_page.has(key) {
                continue;
            }
            if let Some(value) = self.inherited(page, key) {
                new_page.set(key.to_vec(), copier.copy(&value));
            }
        }
        new_page.set("Parent", Object::Reference(pages_id));
        copier
            .target
            .objects
            .insert(new_page_id, Object::Dictionary(new_page));

        let pages_dict = copier.target.get_dictionary_mut(pages_id).map_err(|e| {
            PullError::Format(format!("output page tree is broken: {}", e))
        })?;
        if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
            kids.push(Object::Reference(new_page_id));
        }
        if let Ok(Object::Integer(count)) = pages_dict.get_mut(b"Count") {
            *count += 1;
        }
        Ok(())
    }

    /// Walk up /Parent links looking for an inherited attribute.
    fn inherited(&self, page: &Dictionary, key: &[u8]) -> Option<Object> {
        let mut node = page;
        // Bounded to guard against cyclic /Parent chains.
        for _ in 0..64 {
            let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.doc.get_dictionary(parent_id).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
        }
        None
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        doc.save(&path).map_err(|e| {
            PullError::io(
                format!("Failed to save PDF: {}", path.as_ref().display()),
                std::io::Error::other(e.to_string()),
            )
        })?;
        Ok(())
    }
}

/// An empty document with a catalog and an empty page tree.
fn new_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(Vec::new()));
    pages.set("Count", Object::Integer(0));
    let pages_id = doc.add_object(pages);

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|e| PullError::Format(format!("output has no page tree: {}", e)))
}

/// Copies objects from one document into another, following references.
///
/// Objects reached by reference are copied once and shared via `copied`.
/// References to page tree nodes resolve through `pages` to the output page
/// copied from them, or to null, so a copy never drags in the source page
/// tree.
struct PageCopier<'a> {
    source: &'a Document,
    target: Document,
    copied: BTreeMap<ObjectId, ObjectId>,
    pages: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    fn new(source: &'a Document, target: Document) -> Self {
        PageCopier {
            source,
            target,
            copied: BTreeMap::new(),
            pages: BTreeMap::new(),
        }
    }

    fn copy(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(*id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Array(items) => Object::Array(items.iter().map(|item| self.copy(item)).collect()),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(&stream.dict);
                let mut new_stream = stream.clone();
                new_stream.dict = dict;
                Object::Stream(new_stream)
            }
            other => other.clone(),
        }
    }

    fn copy_reference(&mut self, id: ObjectId) -> Object {
        if let Some(&new_id) = self.pages.get(&id).or_else(|| self.copied.get(&id)) {
            return Object::Reference(new_id);
        }
        let source = self.source;
        let referenced = match source.get_object(id) {
            Ok(referenced) => referenced,
            Err(err) => {
                warn!(?id, %err, "cannot resolve reference, using null");
                return Object::Null;
            }
        };
        if is_page_tree_node(referenced) {
            debug!(?id, "reference to a page that is not extracted, using null");
            return Object::Null;
        }
        // Reserve the id first so cycles resolve to it.
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);
        let value = self.copy(referenced);
        self.target.objects.insert(new_id, value);
        Object::Reference(new_id)
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            new_dict.set(key.clone(), self.copy(value));
        }
        new_dict
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Page" || name == b"Pages")
}
