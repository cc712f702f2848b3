// End-to-end runs of the public tool API against real files in temp dirs.

use std::path::Path;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use qfasttools::config::Settings;
use qfasttools::io::{self, GifFrame, SaveFormat};
use qfasttools::naming::{CounterStyle, OutputNamer};
use qfasttools::preview::DisplayMapping;
use qfasttools::tool::ToolSession;
use qfasttools::tools::convert::{self, ConvertOptions};
use qfasttools::tools::crop::Crop;
use qfasttools::tools::gif_opt::{self, GifOptions};
use qfasttools::tools::resize::{self, LegacyCommand};
use qfasttools::tools::{invert, qr};

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn write_jpeg(path: &Path, w: u32, h: u32) {
    RgbImage::from_pixel(w, h, Rgb([120, 60, 30])).save(path).unwrap();
}

#[test]
fn namer_strips_previous_token_and_counts_up() {
    let dir = tempfile::tempdir().unwrap();
    let namer = OutputNamer::new("_cropped", CounterStyle::ZeroPadded);
    let src = dir.path().join("holiday_cropped01.jpg");

    let first = namer.reserve(&src).unwrap().commit();
    let second = namer.reserve(&src).unwrap().commit();
    assert_eq!(first, dir.path().join("holiday_cropped01.jpg"));
    assert_eq!(second, dir.path().join("holiday_cropped02.jpg"));
}

#[test]
fn crop_selection_on_display_saves_zero_padded_copy() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("name.jpg");
    write_jpeg(&src, 1000, 800);

    // the image shown at half size in a 500x400 area
    let mapping = DisplayMapping::fit(1000, 800, 500, 400);
    let crop = Crop::from_display(&mapping, (100.0, 100.0), (300.0, 250.0)).unwrap();
    let mut session = ToolSession::new(crop, Settings::default());
    session.load(&src).unwrap();
    session.refresh_preview().unwrap();
    assert_eq!(session.preview().unwrap().dimensions(), (100, 75));

    let out = session.save().unwrap().unwrap();
    assert_eq!(out, dir.path().join("name_cropped01.jpg"));
    let saved = image::open(&out).unwrap();
    assert_eq!((saved.width(), saved.height()), (400, 300));
    assert!(dir.path().join("name.jpg").exists());
}

#[test]
fn gif_optimizer_skips_and_retimes_frames() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("clip.gif");
    let frames: Vec<GifFrame> = (0..10)
        .map(|i| GifFrame {
            image: RgbaImage::from_pixel(32, 16, Rgba([i * 25, 80, 160, 255])),
            delay_ms: 500,
        })
        .collect();
    let mut bytes = Vec::new();
    io::encode_gif(&mut bytes, &frames, 256, true).unwrap();
    std::fs::write(&src, &bytes).unwrap();

    let opts = GifOptions { skip: 2, speed: 2.0, colors: 64, ..Default::default() };
    let out = gif_opt::optimize(&src, &opts).unwrap();
    assert_eq!(out, dir.path().join("clip_optimized_1.gif"));

    let written = io::decode_gif_frames(&out).unwrap();
    assert_eq!(written.len(), 5);
    assert!(written.iter().all(|f| f.delay_ms == 500));
    assert_eq!(written[0].image.dimensions(), (32, 16));
}

#[test]
fn converter_batch_writes_into_destination() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("converted");
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.jpg");
    RgbaImage::from_pixel(40, 40, Rgba([0, 200, 0, 255])).save(&a).unwrap();
    write_jpeg(&b, 40, 20);

    let mut opts = ConvertOptions::new(SaveFormat::Webp, &Settings::default());
    opts.scale_percent = 50;
    opts.destination = Some(out_dir.clone());
    let mut ticks = 0;
    let report = convert::run(&[a, b], &opts, |_, _| ticks += 1).unwrap();

    assert_eq!(ticks, 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        report.written,
        vec![out_dir.join("a.converted1.webp"), out_dir.join("b.converted1.webp")]
    );
    let b_out = image::open(&report.written[1]).unwrap();
    assert_eq!((b_out.width(), b_out.height()), (20, 10));
}

#[test]
fn converter_merges_pdf_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pages: Vec<_> = (0..3)
        .map(|i| {
            let p = dir.path().join(format!("page{}.png", i));
            RgbaImage::from_pixel(60, 80, Rgba([255, 255, 255, 255])).save(&p).unwrap();
            p
        })
        .collect();
    let mut opts = ConvertOptions::new(SaveFormat::Pdf, &Settings::default());
    opts.merge_pdf = true;
    let report = convert::run(&pages, &opts, |_, _| {}).unwrap();
    assert_eq!(report.written, vec![dir.path().join("page0.converted1.pdf")]);
    assert!(std::fs::read(&report.written[0]).unwrap().starts_with(b"%PDF"));
}

#[test]
fn qr_round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let code = qr::generate("WIFI:T:WPA;S:office;P:secret;;").unwrap().unwrap();
    let saved = qr::save(&code, &dir.path().join("wifi.png")).unwrap();
    assert_eq!(saved, dir.path().join("wifi.png"));
    assert_eq!(qr::decode_file(&saved).unwrap(), "WIFI:T:WPA;S:office;P:secret;;");
}

#[test]
fn legacy_resize_tokens_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("small");
    std::fs::create_dir(&target).unwrap();
    let src = dir.path().join("photo.jpg");
    write_jpeg(&src, 1200, 600);

    let cmd = resize::parse_legacy(&args(&[
        "r",
        "w300",
        src.to_str().unwrap(),
        target.to_str().unwrap(),
    ]))
    .unwrap();
    let LegacyCommand::Run(job) = cmd else {
        panic!("expected a resize job");
    };
    let out = resize::run_legacy(&job, &Settings::default()).unwrap();
    assert_eq!(out, target.join("photo_resized_1.jpg"));
    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (300, 150));
}

#[test]
fn legacy_resize_reports_missing_width() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("photo.jpg");
    write_jpeg(&src, 10, 10);
    assert!(resize::parse_legacy(&args(&["p", src.to_str().unwrap()])).is_err());
    assert_eq!(resize::parse_legacy(&args(&["r", "help"])).unwrap(), LegacyCommand::Help);
}

#[test]
fn double_inversion_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("art.png");
    let original = RgbaImage::from_fn(16, 16, |x, y| Rgba([x as u8 * 16, y as u8 * 16, 77, 200]));
    original.save(&src).unwrap();

    let once = invert::invert_files(&[src], &Settings::default()).unwrap();
    let twice = invert::invert_files(&once, &Settings::default()).unwrap();
    assert_eq!(twice[0], dir.path().join("art_inverted02.png"));
    assert_eq!(image::open(&twice[0]).unwrap().into_rgba8(), original);
}
