//! PDF loading and page concatenation via lopdf.
//!
//! [`Merger`] builds a fresh output document: every appended source has its
//! pages deep-copied (with everything they reference) under a single flat
//! page tree, in source order. Nothing touches the filesystem until the
//! caller writes [`MergedPdf::bytes`] out.
//!
//! ```text
//! source A ─┐                 ┌─ Catalog ── Pages ── [A1 A2 A3 B1 B2]
//! source B ─┴─ Merger::append ┤
//!                             └─ Outlines (optional, one entry per source)
//! ```

use crate::error::PipelineError;
use lopdf::xref::XrefType;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees with `/Parent` cycles.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used only when a page and all its ancestors lack `/MediaBox`.
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Read and parse a PDF, rejecting documents that stay encrypted.
///
/// lopdf transparently decrypts files protected only by an owner password;
/// anything that still carries `/Encrypt` afterwards needs a user password.
pub fn load_pdf(path: &Path) -> Result<Document, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::read_failed(path, e))?;
    let doc = Document::load_mem(&bytes).map_err(|e| PipelineError::InvalidPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(PipelineError::EncryptedPdf {
            path: path.to_path_buf(),
        });
    }
    Ok(doc)
}

/// Settings for one merge.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Header version of the output, e.g. `"1.7"`.
    pub pdf_version: String,
    /// Add one bookmark per source pointing at its first page.
    pub outline_per_file: bool,
    /// Flate-compress streams that are stored uncompressed.
    pub compress: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            pdf_version: "1.7".to_string(),
            outline_per_file: false,
            compress: false,
        }
    }
}

/// A serialised merge result.
#[derive(Debug)]
pub struct MergedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// One bookmark: title and the output page it opens.
struct OutlineEntry {
    title: String,
    first_page: ObjectId,
}

/// Accumulates pages from several sources into one output document.
pub struct Merger {
    target: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    outline: Vec<OutlineEntry>,
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Self {
        let mut target = Document::with_version(options.pdf_version.clone());
        target.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
            outline: Vec::new(),
            options,
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source` in its own order. Returns the number
    /// of pages appended; a zero-page source is legal and appends nothing.
    ///
    /// `path` is used for the bookmark title and for error messages.
    pub fn append(&mut self, path: &Path, source: &Document) -> Result<usize, PipelineError> {
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        if source_pages.is_empty() {
            warn!("{} has no pages; skipping", path.display());
            return Ok(0);
        }

        let invalid = |e: lopdf::Error| PipelineError::InvalidPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        };

        let mut copier = ObjectCopier::new(source, &mut self.target);

        // Reserve ids for every page first so that references between pages
        // of the same source (link targets, annotation /P) land on the copies
        // instead of dragging in the source page tree.
        let reserved: Vec<ObjectId> = source_pages
            .iter()
            .map(|&src| copier.reserve(src))
            .collect();

        for (&src_id, &dst_id) in source_pages.iter().zip(&reserved) {
            let page = flatten_page(source, src_id).map_err(invalid)?;
            let mut copied = copier.remap_dictionary(page);
            copied.set("Parent", self.pages_id);
            copier.target.objects.insert(dst_id, Object::Dictionary(copied));
        }
        copier.drain();

        debug!(
            "Appended {} pages from {} ({} objects copied)",
            reserved.len(),
            path.display(),
            copier.id_map.len()
        );

        if self.options.outline_per_file {
            self.outline.push(OutlineEntry {
                title: outline_title(path),
                first_page: reserved[0],
            });
        }
        self.kids.extend(reserved.iter().map(|&id| Object::Reference(id)));
        Ok(reserved.len())
    }

    /// Close the page tree, attach the outline and serialise.
    pub fn finish(mut self) -> Result<MergedPdf, PipelineError> {
        let page_count = self.kids.len();
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => std::mem::take(&mut self.kids),
                "Count" => page_count as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        if !self.outline.is_empty() {
            let outlines_id = write_outline(&mut self.target, &self.outline);
            catalog.set("Outlines", outlines_id);
            catalog.set("PageMode", "UseOutlines");
        }
        let catalog_id = self.target.add_object(catalog);
        self.target.trailer.set("Root", catalog_id);

        if self.options.compress {
            self.target.compress();
        }

        let mut bytes = Vec::new();
        self.target
            .save_to(&mut bytes)
            .map_err(|e| PipelineError::Internal(format!("PDF serialisation failed: {e}")))?;

        Ok(MergedPdf { bytes, page_count })
    }
}

// ── Object copying ───────────────────────────────────────────────────────

/// Copies objects from one document into another, each source object at
/// most once.
///
/// References are followed with an explicit worklist rather than recursion:
/// reference chains (`/Next` actions, article beads) can be tens of
/// thousands of objects long.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
    /// Mapped but not yet copied: (source id, target id).
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Allocate the target id for `source_id` without queueing a copy; the
    /// caller fills it in.
    fn reserve(&mut self, source_id: ObjectId) -> ObjectId {
        let id = self.target.new_object_id();
        self.id_map.insert(source_id, id);
        id
    }

    /// Target id for `source_id`, queueing the object on first sight.
    fn map_id(&mut self, source_id: ObjectId) -> ObjectId {
        if let Some(&target_id) = self.id_map.get(&source_id) {
            return target_id;
        }
        // A reference to a missing object is the null object.
        let target_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, target_id);
        self.pending.push((source_id, target_id));
        target_id
    }

    /// Copy every queued object, and everything those reference in turn.
    fn drain(&mut self) {
        while let Some((source_id, target_id)) = self.pending.pop() {
            let Some(obj) = self.source.objects.get(&source_id).cloned() else {
                continue;
            };
            let copied = self.remap_references(obj);
            self.target.objects.insert(target_id, copied);
        }
    }

    /// Rewrite the references directly inside `obj`. Referenced objects are
    /// only queued, never visited here.
    fn remap_references(&mut self, obj: Object) -> Object {
        match obj {
            Object::Reference(id) => Object::Reference(self.map_id(id)),
            Object::Array(arr) => Object::Array(
                arr.into_iter()
                    .map(|o| self.remap_references(o))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.remap_dictionary(dict)),
            Object::Stream(mut stream) => {
                stream.dict = self.remap_dictionary(stream.dict);
                Object::Stream(stream)
            }
            other => other,
        }
    }

    fn remap_dictionary(&mut self, mut dict: Dictionary) -> Dictionary {
        for (_, value) in dict.iter_mut() {
            let owned = std::mem::replace(value, Object::Null);
            *value = self.remap_references(owned);
        }
        dict
    }
}

// ── Page helpers ─────────────────────────────────────────────────────────

/// The page dictionary with inherited attributes made explicit and its
/// `/Parent` link removed.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_dictionary(page_id)?.clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited(doc, &page, key) {
            page.set(key.to_vec(), value);
        }
    }
    if !page.has(b"MediaBox") {
        page.set(
            "MediaBox",
            FALLBACK_MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        );
    }
    if !page.has(b"Resources") {
        page.set("Resources", Dictionary::new());
    }

    page.remove(b"Parent");
    Ok(page)
}

fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

// ── Outline ──────────────────────────────────────────────────────────────

fn outline_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_outline(doc: &mut Document, entries: &[OutlineEntry]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    for (i, entry) in entries.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => lopdf::text_string(&entry.title),
            "Parent" => outlines_id,
            "Dest" => vec![Object::Reference(entry.first_page), "Fit".into()],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if let Some(&next) = item_ids.get(i + 1) {
            item.set("Next", next);
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_ids[0],
            "Last" => item_ids[item_ids.len() - 1],
            "Count" => item_ids.len() as i64,
        }),
    );
    outlines_id
}
