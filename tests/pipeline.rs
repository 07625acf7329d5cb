//! Integration tests for the public pipeline API.
//!
//! Every fixture is generated on the fly into a temp directory (PDFs with
//! lopdf, images with the `image` crate), so these run offline and need no
//! LibreOffice install.

use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use paperstack::{
    classify, combine, combine_with_stats, convert_to_pdf, inspect, list_pdfs, run, run_async,
    ErrorKind, FnRenderer, FormatKind, InputFile, PipelineConfig, PipelineResult, RenderError,
    UnavailableRenderer,
};
use paperstack::{CombineRequest, ConversionRequest, Request};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Write a PDF whose pages each show "<prefix> <n>".
fn write_pdf(dir: &Path, name: &str, pages: u32, prefix: &str) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = vec![];
    for i in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{prefix} {i}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Text of every page of the PDF at `path`, in page order.
fn page_texts(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| op.operands.first())
                .filter_map(|o| o.as_str().ok())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .collect::<Vec<_>>()
                .join("")
        })
        .collect()
}

fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// Route library logs through the test harness; `RUST_LOG=paperstack=debug`
/// shows them with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> PipelineConfig {
    PipelineConfig::builder()
        .renderer(Arc::new(UnavailableRenderer))
        .build()
        .unwrap()
}

fn inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<InputFile> {
    paths.iter().map(|p| InputFile::new(p.as_ref())).collect()
}

/// Files in `dir`, excluding the ones named in `keep`.
fn stray_files(dir: &Path, keep: &[&str]) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !keep.contains(&n.as_str()))
        .collect()
}

fn failure(r: PipelineResult) -> (ErrorKind, String) {
    match r {
        PipelineResult::Failure { kind, message } => (kind, message),
        PipelineResult::Success { output } => panic!("expected failure, wrote {}", output.display()),
    }
}

// ── Format inspector ─────────────────────────────────────────────────────────

#[test]
fn test_classify_by_extension_only() {
    assert_eq!(classify(Path::new("letter.docx")), FormatKind::WordDocument);
    assert_eq!(classify(Path::new("scan.JPEG")), FormatKind::Image);
    assert_eq!(classify(Path::new("photo.png")), FormatKind::Image);
    assert_eq!(classify(Path::new("report.Pdf")), FormatKind::Pdf);
    assert_eq!(classify(Path::new("notes.xyz")), FormatKind::Unsupported);
    assert_eq!(classify(Path::new("README")), FormatKind::Unsupported);
    assert_eq!(classify(Path::new("letter.doc")), FormatKind::Unsupported);
}

#[test]
fn test_inspect_pdf_and_image() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "report.pdf", 3, "R");
    let jpg = write_jpeg(dir.path(), "scan.jpg", 40, 20);

    let info = inspect(&pdf).unwrap();
    assert_eq!(info.kind, FormatKind::Pdf);
    assert_eq!(info.page_count, Some(3));
    assert_eq!(info.pdf_version.as_deref(), Some("1.5"));

    let info = inspect(&jpg).unwrap();
    assert_eq!(info.kind, FormatKind::Image);
    assert_eq!(info.dimensions, Some((40, 20)));
}

// ── Single-file converter ────────────────────────────────────────────────────

#[test]
fn test_pdf_passthrough_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let src = write_pdf(dir.path(), "in.pdf", 2, "P");
    let once = dir.path().join("once.pdf");
    let twice = dir.path().join("twice.pdf");

    assert!(convert_to_pdf(&InputFile::new(&src), &once, &config()).is_success());
    assert!(convert_to_pdf(&InputFile::new(&once), &twice, &config()).is_success());

    let original = std::fs::read(&src).unwrap();
    assert_eq!(std::fs::read(&once).unwrap(), original);
    assert_eq!(std::fs::read(&twice).unwrap(), original);
}

#[test]
fn test_jpeg_becomes_single_native_size_page() {
    let dir = TempDir::new().unwrap();
    let jpg = write_jpeg(dir.path(), "photo.jpg", 800, 600);
    let out = dir.path().join("photo.pdf");

    let r = run(&ConversionRequest::new(&jpg, &out).into(), &config());
    assert_eq!(r.output(), Some(out.as_path()));

    let doc = Document::load(&out).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let page = doc.get_dictionary(pages[&1]).unwrap();
    let media_box: Vec<f32> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect();
    assert_eq!(media_box, vec![0.0, 0.0, 800.0, 600.0]);
}

#[test]
fn test_image_conversion_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let jpg = write_jpeg(dir.path(), "photo.jpg", 64, 48);
    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.pdf");

    assert!(convert_to_pdf(&InputFile::new(&jpg), &a, &config()).is_success());
    assert!(convert_to_pdf(&InputFile::new(&jpg), &b, &config()).is_success());
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn test_unsupported_extension_never_reaches_renderer() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("notes.xyz");
    std::fs::write(&src, b"plain text").unwrap();
    let out = dir.path().join("notes.pdf");

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let cfg = PipelineConfig::builder()
        .renderer(Arc::new(FnRenderer(move |_: &Path, _: &Path| -> Result<(), RenderError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })))
        .build()
        .unwrap();

    let (kind, message) = failure(convert_to_pdf(&InputFile::new(&src), &out, &cfg));
    assert_eq!(kind, ErrorKind::UnsupportedFormat);
    assert!(message.contains(".xyz"), "got: {message}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!out.exists());
}

#[test]
fn test_unwritable_parent_fails_before_renderer() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("letter.docx");
    std::fs::write(&src, b"PK\x03\x04").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let cfg = PipelineConfig::builder()
        .renderer(Arc::new(FnRenderer(move |_: &Path, _: &Path| -> Result<(), RenderError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })))
        .build()
        .unwrap();

    let out = dir.path().join("no/such/dir/letter.pdf");
    let (kind, _) = failure(convert_to_pdf(&InputFile::new(&src), &out, &cfg));
    assert_eq!(kind, ErrorKind::IoError);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_renderer_error_leaves_no_output() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("letter.docx");
    std::fs::write(&src, b"PK\x03\x04").unwrap();
    let out = dir.path().join("letter.pdf");

    let cfg = PipelineConfig::builder()
        .renderer(Arc::new(FnRenderer(|_: &Path, _: &Path| -> Result<(), RenderError> {
            Err(RenderError::Other("conversion filter missing".into()))
        })))
        .build()
        .unwrap();

    let (kind, message) = failure(convert_to_pdf(&InputFile::new(&src), &out, &cfg));
    assert_eq!(kind, ErrorKind::UnsupportedRenderer);
    assert!(message.contains("conversion filter missing"), "got: {message}");
    assert_eq!(stray_files(dir.path(), &["letter.docx"]), Vec::<String>::new());
}

#[test]
fn test_renderer_success_without_output_is_failure() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("letter.docx");
    std::fs::write(&src, b"PK\x03\x04").unwrap();
    let out = dir.path().join("letter.pdf");

    let cfg = PipelineConfig::builder()
        .renderer(Arc::new(FnRenderer(|_: &Path, _: &Path| -> Result<(), RenderError> {
            Ok(())
        })))
        .build()
        .unwrap();

    let (kind, _) = failure(convert_to_pdf(&InputFile::new(&src), &out, &cfg));
    assert_eq!(kind, ErrorKind::UnsupportedRenderer);
    assert!(!out.exists());
}

// ── Multi-file combiner ──────────────────────────────────────────────────────

#[test]
fn test_combine_three_plus_two_pages() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let r1 = write_pdf(dir.path(), "report1.pdf", 3, "one");
    let r2 = write_pdf(dir.path(), "report2.pdf", 2, "two");
    let out = dir.path().join("merged.pdf");

    let stats = combine_with_stats(&inputs(&[&r1, &r2]), &out, &config()).unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.pages, 5);
    assert_eq!(stats.bytes_written, std::fs::metadata(&out).unwrap().len());
    assert_eq!(
        page_texts(&out),
        vec!["one 1", "one 2", "one 3", "two 1", "two 2"]
    );
}

#[test]
fn test_combine_single_file_keeps_pages() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 4, "A");
    let out = dir.path().join("out.pdf");

    assert!(combine(&inputs(&[&a]), &out, &config()).is_success());
    assert_eq!(page_texts(&out), page_texts(&a));
}

#[test]
fn test_combine_is_associative() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 2, "A");
    let b = write_pdf(dir.path(), "b.pdf", 1, "B");
    let c = write_pdf(dir.path(), "c.pdf", 3, "C");
    let ab = dir.path().join("ab.pdf");
    let ab_c = dir.path().join("ab_c.pdf");
    let abc = dir.path().join("abc.pdf");

    assert!(combine(&inputs(&[&a, &b]), &ab, &config()).is_success());
    assert!(combine(&inputs(&[&ab, &c]), &ab_c, &config()).is_success());
    assert!(combine(&inputs(&[&a, &b, &c]), &abc, &config()).is_success());

    assert_eq!(page_texts(&ab_c), page_texts(&abc));
    assert_eq!(page_texts(&abc).len(), 6);
}

#[test]
fn test_combine_duplicates_are_not_deduplicated() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 2, "A");
    let out = dir.path().join("out.pdf");

    assert!(combine(&inputs(&[&a, &a, &a]), &out, &config()).is_success());
    assert_eq!(page_texts(&out).len(), 6);
}

#[test]
fn test_combine_zero_page_input_contributes_nothing() {
    let dir = TempDir::new().unwrap();
    let empty = write_pdf(dir.path(), "empty.pdf", 0, "E");
    let a = write_pdf(dir.path(), "a.pdf", 2, "A");
    let out = dir.path().join("out.pdf");

    assert!(combine(&inputs(&[&empty, &a, &empty]), &out, &config()).is_success());
    assert_eq!(page_texts(&out), vec!["A 1", "A 2"]);
}

#[test]
fn test_invalid_pdf_leaves_destination_untouched() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let good = write_pdf(dir.path(), "report1.pdf", 1, "G");
    let bad = dir.path().join("report2.pdf");
    std::fs::write(&bad, b"this is not a pdf").unwrap();
    let out = dir.path().join("merged.pdf");
    std::fs::write(&out, b"previous contents").unwrap();

    let (kind, message) = failure(combine(&inputs(&[&good, &bad]), &out, &config()));
    assert_eq!(kind, ErrorKind::InvalidPdf);
    assert!(message.contains("report2.pdf"), "got: {message}");
    assert_eq!(std::fs::read(&out).unwrap(), b"previous contents");
    assert_eq!(
        stray_files(dir.path(), &["report1.pdf", "report2.pdf", "merged.pdf"]),
        Vec::<String>::new()
    );
}

#[test]
fn test_combine_rejects_image_input() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 1, "A");
    let jpg = write_jpeg(dir.path(), "scan.jpg", 8, 8);
    let out = dir.path().join("out.pdf");

    let (kind, message) = failure(combine(&inputs(&[&a, &jpg]), &out, &config()));
    assert_eq!(kind, ErrorKind::UnsupportedFormat);
    assert!(message.contains("scan.jpg"), "got: {message}");
    assert!(!out.exists());
}

#[test]
fn test_empty_combine_request() {
    let dir = TempDir::new().unwrap();
    let req = Request::Combine(CombineRequest::new(Vec::<PathBuf>::new(), dir.path().join("o.pdf")));
    let (kind, _) = failure(run(&req, &config()));
    assert_eq!(kind, ErrorKind::EmptyRequest);
}

#[test]
fn test_bookmarks_one_per_file() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "intro.pdf", 2, "A");
    let b = write_pdf(dir.path(), "appendix.pdf", 1, "B");
    let out = dir.path().join("book.pdf");

    let cfg = PipelineConfig::builder()
        .outline_per_file(true)
        .renderer(Arc::new(UnavailableRenderer))
        .build()
        .unwrap();
    assert!(combine(&inputs(&[&a, &b]), &out, &cfg).is_success());

    let doc = Document::load(&out).unwrap();
    let outlines_id = doc.catalog().unwrap().get(b"Outlines").unwrap().as_reference().unwrap();
    let outlines = doc.get_dictionary(outlines_id).unwrap();
    assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 2);

    let first_id = outlines.get(b"First").unwrap().as_reference().unwrap();
    let first = doc.get_dictionary(first_id).unwrap();
    assert_eq!(lopdf::decode_text_string(first.get(b"Title").unwrap()).unwrap(), "intro");
}

#[test]
fn test_combine_long_action_chain() {
    let dir = TempDir::new().unwrap();
    let plain = write_pdf(dir.path(), "plain.pdf", 1, "P");
    let linked = dir.path().join("linked.pdf");

    // One link annotation whose /A starts a 12_000 long /Next chain.
    let mut doc = Document::load(&plain).unwrap();
    let mut next: Option<lopdf::ObjectId> = None;
    for i in 0..12_000 {
        let mut action = dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(format!("https://example.com/{i}")),
        };
        if let Some(id) = next {
            action.set("Next", id);
        }
        next = Some(doc.add_object(action));
    }
    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
        "A" => next.unwrap(),
    });
    let first = *doc.get_pages().values().next().unwrap();
    doc.get_dictionary_mut(first)
        .unwrap()
        .set("Annots", vec![Object::Reference(annot_id)]);
    doc.save(&linked).unwrap();

    let a = write_pdf(dir.path(), "a.pdf", 1, "A");
    let out = dir.path().join("out.pdf");
    assert!(combine(&inputs(&[&a, &linked]), &out, &config()).is_success());
    assert_eq!(page_texts(&out), vec!["A 1", "P 1"]);

    let merged = Document::load(&out).unwrap();
    let page = *merged.get_pages().values().nth(1).unwrap();
    let annots = merged.get_dictionary(page).unwrap().get(b"Annots").unwrap();
    let annot_id = annots.as_array().unwrap()[0].as_reference().unwrap();
    let mut action = merged
        .get_dictionary(annot_id)
        .unwrap()
        .get(b"A")
        .unwrap()
        .as_reference()
        .ok();
    let mut len = 0;
    while let Some(id) = action {
        len += 1;
        action = merged
            .get_dictionary(id)
            .unwrap()
            .get(b"Next")
            .ok()
            .and_then(|o| o.as_reference().ok());
    }
    assert_eq!(len, 12_000);
}

#[test]
fn test_concurrent_combines_to_same_destination() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let one = write_pdf(dir.path(), "one.pdf", 1, "X");
    let a = write_pdf(dir.path(), "a.pdf", 1, "A");
    let b = write_pdf(dir.path(), "b.pdf", 1, "B");
    let out = dir.path().join("shared.pdf");

    let small = inputs(&[&one]);
    let large = inputs(&[&a, &b]);
    let cfg = config();

    let results: Vec<PipelineResult> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let set = if i % 2 == 0 { &small } else { &large };
                let (out, cfg) = (&out, &cfg);
                s.spawn(move || combine(set, out, cfg))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for r in &results {
        assert!(r.is_success(), "{r:?}");
    }
    // Whole output of exactly one writer, never a mix.
    let texts = page_texts(&out);
    assert!(
        texts == vec!["X 1"] || texts == vec!["A 1", "B 1"],
        "got: {texts:?}"
    );
    assert_eq!(
        stray_files(dir.path(), &["one.pdf", "a.pdf", "b.pdf", "shared.pdf"]),
        Vec::<String>::new()
    );
}

#[test]
fn test_combine_directory_listing_in_name_order() {
    let dir = TempDir::new().unwrap();
    let chapters = dir.path().join("chapters");
    std::fs::create_dir(&chapters).unwrap();
    write_pdf(&chapters, "02.pdf", 1, "two");
    write_pdf(&chapters, "01.PDF", 2, "one");
    write_pdf(&chapters, "03.pdf", 1, "three");
    write_jpeg(&chapters, "cover.jpg", 4, 4);
    let out = dir.path().join("book.pdf");

    let pdfs = list_pdfs(&chapters).unwrap();
    assert_eq!(pdfs.len(), 3);
    assert!(combine(&inputs(&pdfs), &out, &config()).is_success());
    assert_eq!(page_texts(&out), vec!["one 1", "one 2", "two 1", "three 1"]);
}

// ── Async facade ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_run_async_combines() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 1, "A");
    let b = write_pdf(dir.path(), "b.pdf", 1, "B");
    let out = dir.path().join("out.pdf");

    let req = Request::from(CombineRequest::new([&a, &b], &out));
    let result = run_async(req, config()).await;
    assert!(result.is_success());
    assert_eq!(page_texts(&out), vec!["A 1", "B 1"]);
}

#[test]
fn test_run_async_outside_runtime_with_block_on() {
    let dir = TempDir::new().unwrap();
    let jpg = write_jpeg(dir.path(), "scan.jpg", 10, 10);
    let out = dir.path().join("scan.pdf");

    let req = Request::from(ConversionRequest::new(&jpg, &out));
    let result = tokio_test::block_on(run_async(req, config()));
    assert_eq!(result.error_kind(), None);
    assert!(out.exists());
}

#[test]
fn test_pipeline_result_json_shape() {
    let dir = TempDir::new().unwrap();
    let r = run(
        &CombineRequest::new(Vec::<PathBuf>::new(), dir.path().join("o.pdf")).into(),
        &config(),
    );
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["kind"], "empty_request");
}
