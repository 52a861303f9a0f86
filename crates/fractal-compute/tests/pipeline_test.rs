//! End-to-end renders.

mod common;

use std::fs::File;
use std::path::Path;

use common::{kernel_path, params_text, MockRuntime};
use fractal_compute::{render, run, Backend, ComputeError, FirstEligible, RenderConfig, RenderJob};
use fractal_core::{quantize, FractalMode};

const BASE: [f64; 9] = [0.25, 0.5, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

fn job(dir: &Path, params: &str, output: &str) -> RenderJob {
    let params_path = dir.join("params.txt");
    std::fs::write(&params_path, params).unwrap();
    RenderJob::new(FractalMode::Mandelbrot, params_path, dir.join(output)).with_config(RenderConfig {
        backend: Backend::Cpu,
        kernel_path: kernel_path(),
        ..Default::default()
    })
}

fn decode(path: &Path) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(std::io::BufReader::new(File::open(path).unwrap()));
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0u8; reader.output_buffer_size().unwrap()];
    let info = reader.next_frame(&mut buf).unwrap();
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf)
}

#[test]
fn test_missing_params_touches_no_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::single();
    let job = RenderJob::new(FractalMode::Julia, dir.path().join("absent.txt"), dir.path().join("out.png"));

    let err = run(&rt, &job, &mut FirstEligible).unwrap_err();
    match err {
        ComputeError::InputFile { path, .. } => assert!(path.ends_with("absent.txt")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(rt.calls().is_empty());
    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn test_unsupported_output_touches_no_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::single();
    let job = job(dir.path(), &params_text(4, 4, 10, [-2.0, 1.0, -1.0, 1.0], BASE), "out.bmp");

    let err = run(&rt, &job, &mut FirstEligible).unwrap_err();
    assert!(matches!(err, ComputeError::OutputWriter(_)));
    assert!(rt.calls().is_empty());
}

#[test]
fn test_unwritable_output_touches_no_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::single();
    let job = job(dir.path(), &params_text(4, 4, 10, [-2.0, 1.0, -1.0, 1.0], BASE), "no_such_dir/out.png");

    let err = run(&rt, &job, &mut FirstEligible).unwrap_err();
    assert!(matches!(err, ComputeError::OutputWriter(fractal_io::IoError::Io(_))));
    assert_eq!(rt.count("create_context"), 0);
    assert_eq!(rt.count("enqueue_kernel"), 0);
    assert!(rt.calls().is_empty());
}

#[test]
fn test_failed_render_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::new(vec![]);
    let job = job(dir.path(), &params_text(4, 4, 10, [-2.0, 1.0, -1.0, 1.0], BASE), "out.png");

    let err = run(&rt, &job, &mut FirstEligible).unwrap_err();
    assert!(matches!(err, ComputeError::NoPlatforms));
    assert!(!job.output_path.exists());
}

#[test]
fn test_missing_kernel_source() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::single();
    let mut job = job(dir.path(), &params_text(4, 4, 10, [-2.0, 1.0, -1.0, 1.0], BASE), "out.png");
    job.config.kernel_path = dir.path().join("missing.cl");

    assert!(matches!(run(&rt, &job, &mut FirstEligible), Err(ComputeError::InputFile { .. })));
    assert!(rt.calls().is_empty());
}

#[test]
fn test_mock_render_writes_first_base_row() {
    let dir = tempfile::tempdir().unwrap();
    let rt = MockRuntime::single();
    let job = job(dir.path(), &params_text(6, 10, 10, [-2.0, 1.0, -1.0, 1.0], BASE), "out.png");

    let summary = run(&rt, &job, &mut FirstEligible).unwrap();
    assert_eq!((summary.width, summary.height), (10, 6));
    assert_eq!(summary.device, "Mock GPU");
    assert_eq!(rt.released().last().map(String::as_str), Some("context"));

    let (w, h, pixels) = decode(&job.output_path);
    assert_eq!((w, h), (10, 6));
    assert!(pixels.chunks(3).all(|px| px == [64, 128, 255]));
}

#[test]
fn test_degenerate_bounds_zero_iterations() {
    let dir = tempfile::tempdir().unwrap();
    // realMin == realMax and imagMin == imagMax collapse the view to one point.
    let job = job(dir.path(), &params_text(9, 13, 0, [0.3, 0.3, -0.2, -0.2], BASE), "flat.png");

    let summary = render(&job, &mut FirstEligible).unwrap();
    assert_eq!(summary.backend, "cpu");
    assert_eq!(summary.geometry.global, [16, 16]);

    let expected = [quantize(BASE[0]), quantize(BASE[1]), quantize(BASE[2])];
    let (w, h, pixels) = decode(&job.output_path);
    assert_eq!((w, h), (13, 9));
    assert_eq!(pixels.len(), 13 * 9 * 3);
    assert!(pixels.chunks(3).all(|px| px == expected));
}

#[test]
fn test_mandelbrot_render_on_host() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(dir.path(), &params_text(3, 3, 100, [-1.5, 1.5, -1.5, 1.5], BASE), "m.png");

    render(&job, &mut FirstEligible).unwrap();
    let (_, _, pixels) = decode(&job.output_path);

    // Centre pixel sits on the origin, inside the set: last base row.
    assert_eq!(&pixels[12..15], &[255, 255, 255]);
    // Corner escapes early and stays close to the first row.
    assert_ne!(&pixels[0..3], &[255, 255, 255]);
}
