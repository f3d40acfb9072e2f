//! End-to-end batch runs against real files.
//!
//! Sources are generated into a temp folder, processed with the production
//! `RustBackend` on the background runner, and the written variants are
//! decoded again to check their dimensions.

use image::{DynamicImage, ImageBuffer, Rgb};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use webcrop::config::{self, AppConfig};
use webcrop::imaging::RustBackend;
use webcrop::overlay::Compositor;
use webcrop::overlay::color::Color;
use webcrop::overlay::font::{EmbeddedOnly, FontCache};
use webcrop::overlay::shapes::{ShapeGeometry, ShapeSpec};
use webcrop::process::{BatchRequest, BatchRunner, BatchSummary, ProcessEvent};
use webcrop::scan::list_source_images;
use webcrop::types::{NormalizedPoint, TargetSize};

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn source_folder() -> TempDir {
    let tmp = TempDir::new().unwrap();
    gradient(2000, 1000).save(tmp.path().join("a.jpg")).unwrap();
    gradient(800, 800).save(tmp.path().join("b.png")).unwrap();
    tmp
}

fn sizes() -> Vec<TargetSize> {
    vec![
        TargetSize::new("Large", 800, 600).unwrap(),
        TargetSize::new("Thumbnail", 300, 200).unwrap(),
    ]
}

fn compositor() -> Compositor {
    Compositor::new(FontCache::new(Box::new(EmbeddedOnly)))
}

fn run(request: BatchRequest) -> (BatchSummary, Vec<ProcessEvent>) {
    let runner = BatchRunner::new(Arc::new(RustBackend::new()));
    let handle = runner.start(request, compositor()).unwrap();
    let events: Vec<_> = handle.events().iter().collect();
    (handle.wait().unwrap(), events)
}

fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

#[test]
fn writes_every_variant_at_exact_size() {
    let src = source_folder();
    let out = TempDir::new().unwrap();
    let sources = list_source_images(src.path()).unwrap();

    let (summary, _) = run(BatchRequest::new(sources, sizes(), out.path()));

    assert!(summary.all_succeeded());
    assert_eq!(dimensions(&out.path().join("800x600/a.jpg")), (800, 600));
    assert_eq!(dimensions(&out.path().join("300x200/a.jpg")), (300, 200));
    assert_eq!(dimensions(&out.path().join("800x600/b.jpg")), (800, 600));
    assert_eq!(dimensions(&out.path().join("300x200/b.jpg")), (300, 200));
}

#[test]
fn one_unwritable_destination_fails_only_its_item() {
    let src = source_folder();
    let out = TempDir::new().unwrap();
    // A directory where the file should go makes that single write fail.
    fs::create_dir_all(out.path().join("300x200/b.jpg")).unwrap();
    let sources = list_source_images(src.path()).unwrap();

    let (summary, events) = run(BatchRequest::new(sources, sizes(), out.path()));

    let processed = events
        .iter()
        .filter(|e| matches!(e, ProcessEvent::ItemProcessed { .. }))
        .count();
    let failed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProcessEvent::ItemFailed { source, size, .. } => {
                Some((source.file_name().unwrap().to_owned(), size.dir_name()))
            }
            _ => None,
        })
        .collect();
    let last_progress = events.iter().rev().find_map(|e| match e {
        ProcessEvent::Progress { percent } => Some(*percent),
        _ => None,
    });

    assert_eq!(processed, 3);
    assert_eq!(failed, vec![("b.png".into(), "300x200".to_string())]);
    assert_eq!(last_progress, Some(100));
    assert!(matches!(events.last(), Some(ProcessEvent::Completed { .. })));
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.failed, 1);
}

#[test]
fn corrupt_source_fails_each_of_its_sizes() {
    let src = source_folder();
    fs::write(src.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
    let out = TempDir::new().unwrap();
    let sources = list_source_images(src.path()).unwrap();
    assert_eq!(sources.len(), 3);

    let (summary, events) = run(BatchRequest::new(sources, sizes(), out.path()));

    let broken_failures = events
        .iter()
        .filter(|e| matches!(e, ProcessEvent::ItemFailed { source, .. } if source.ends_with("broken.jpg")))
        .count();
    assert_eq!(broken_failures, 2);
    assert_eq!(summary.succeeded, 4);
    assert!(!out.path().join("800x600/broken.jpg").exists());
}

#[test]
fn overlays_and_focus_produce_flat_rgb_output() {
    let src = source_folder();
    let out = TempDir::new().unwrap();
    let sources = list_source_images(src.path()).unwrap();

    let mut cfg = AppConfig::default();
    cfg.overlay.shapes_enabled = true;
    cfg.overlay.text_enabled = true;
    cfg.overlay.text.content = "Sample".into();
    cfg.overlay.add_shape(
        ShapeSpec::new(ShapeGeometry::Rectangle {
            from: NormalizedPoint::new(0.0, 0.0),
            to: NormalizedPoint::new(0.25, 0.25),
        })
        .filled(Color::new(255, 0, 0)),
    );

    let request = BatchRequest::new(sources, sizes(), out.path())
        .with_overlay(&cfg.overlay)
        .with_crop(webcrop::process::CropPolicy::AllFiles(NormalizedPoint::new(0.0, 0.5)));
    let (summary, events) = run(request);

    assert!(summary.all_succeeded());
    assert!(events.iter().any(|e| matches!(
        e,
        ProcessEvent::ItemProcessed {
            focus_applied: true,
            overlays: true,
            ..
        }
    )));
    let img = image::open(out.path().join("800x600/a.jpg")).unwrap().to_rgb8();
    let corner = img.get_pixel(10, 10);
    assert!(corner[0] > 200 && corner[1] < 60 && corner[2] < 60, "{corner:?}");
}

#[test]
fn config_file_drives_a_run() {
    let src = source_folder();
    let out = TempDir::new().unwrap();
    let cfg_path = src.path().join("webcrop.toml");
    fs::write(
        &cfg_path,
        r#"
        output_format = "png"
        selected_sizes = ["Thumbnail", "Medium"]
        "#,
    )
    .unwrap();

    let cfg = config::load_config(Some(&cfg_path)).unwrap();
    let sources = list_source_images(src.path()).unwrap();
    let request = BatchRequest::new(sources, cfg.selected_targets(), out.path())
        .with_overlay(&cfg.overlay)
        .with_crop(cfg.crop_policy(src.path()))
        .with_encode(cfg.encode_options());
    let (summary, _) = run(request);

    assert!(summary.all_succeeded());
    assert_eq!(summary.total, 4);
    assert_eq!(dimensions(&out.path().join("600x400/a.png")), (600, 400));
    assert_eq!(dimensions(&out.path().join("300x200/b.png")), (300, 200));
}

#[test]
fn json_report_lists_every_item() {
    let src = source_folder();
    let out = TempDir::new().unwrap();
    let sources = list_source_images(src.path()).unwrap();

    let (summary, _) = run(BatchRequest::new(sources, sizes(), out.path()));
    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["total"], 4);
    assert_eq!(json["results"].as_array().unwrap().len(), 4);
    assert!(json["results"].as_array().unwrap().iter().all(|r| r["status"] == "written"));
}
