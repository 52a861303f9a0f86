//! Parameter file loading from disk.

use std::io::Write;

use fractal_core::{Error, FractalParameters};

#[test]
fn test_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "3 5").unwrap();
    writeln!(file, "100").unwrap();
    writeln!(file, "4.0").unwrap();
    writeln!(file, "-2.0 1.0").unwrap();
    writeln!(file, "-1.5 1.5").unwrap();
    writeln!(file, "0.285 0.01").unwrap();
    writeln!(file, "0.1 0.2 0.3").unwrap();
    writeln!(file, "0.4 0.5 0.6").unwrap();
    writeln!(file, "0.7 0.8 0.9").unwrap();
    file.flush().unwrap();

    let params = FractalParameters::load(file.path()).unwrap();
    assert_eq!((params.rows, params.cols), (3, 5));
    assert_eq!(params.julia, (0.285, 0.01));
    assert_eq!(params.base_color[8], 0.9);
    assert_eq!(params.pixel_count(), 15);
}

#[test]
fn test_load_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.txt");
    match FractalParameters::load(&missing) {
        Err(Error::InputFile { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected InputFile error, got {other:?}"),
    }
}

#[test]
fn test_truncated_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "3 5 100 4.0 -2 1").unwrap();
    file.flush().unwrap();

    let err = FractalParameters::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::MissingField("imagMin")), "{err}");
}
