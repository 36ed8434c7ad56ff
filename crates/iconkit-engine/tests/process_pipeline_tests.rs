#![cfg(unix)]

use iconkit_core::{
    EngineSession, NamespaceScope, OperationKind, PipelineConfig, PipelineError, SourceImage,
};
use iconkit_engine::ProcessEngine;
use iconkit_test_utils::{sample_png, MemorySink};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Converter that copies its input to every output, PNGs at the root
const CONVERTER: &str = r#"#!/bin/sh
op="$1"; shift
pngs() {
  for size in 16 24 30 32 40 48 64 72 80 96 128 256; do
    cp "$1" "$size.png" || exit 4
  done
}
case "$op" in
  wasm_convert_to_ico) cp "$1" "$2" ;;
  wasm_convert_to_icns) cp "$1" "$2" ;;
  wasm_convert_to_pngs) pngs "$1" ;;
  wasm_convert_to_both) cp "$1" "$2.icns" && cp "$1" "$2.ico" && pngs "$1" ;;
  *) exit 9 ;;
esac
"#;

struct Setup {
    _dir: tempfile::TempDir,
    engine: Arc<ProcessEngine>,
    sink: Arc<MemorySink>,
    pipeline: iconkit_core::ConversionPipeline,
}

async fn setup(config: PipelineConfig) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("converter.sh");
    std::fs::write(&script, CONVERTER).unwrap();

    let engine = Arc::new(
        ProcessEngine::new("sh")
            .unwrap()
            .with_leading_args([script.display().to_string()]),
    );
    let session = Arc::new(EngineSession::from_arc(engine.clone()));
    session.initialize().await.unwrap();
    let sink = Arc::new(MemorySink::new());
    let pipeline = iconkit_core::ConversionPipeline::new(session, sink.clone(), config).unwrap();
    Setup {
        _dir: dir,
        engine,
        sink,
        pipeline,
    }
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn files_under(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.push(path.strip_prefix(root).unwrap().display().to_string());
            }
        }
    }
    found
}

#[tokio::test]
async fn test_ico_through_subprocess() {
    let s = setup(PipelineConfig::default()).await;

    let report = s
        .pipeline
        .convert_to_ico(SourceImage::new("logo.png", sample_png()))
        .await
        .unwrap();

    assert_eq!(report.file_name, "logo.ico");
    assert_eq!(s.sink.last().unwrap().bytes, sample_png());
}

#[tokio::test]
async fn test_all_formats_through_subprocess_is_partial() {
    let s = setup(PipelineConfig::default()).await;

    let report = s
        .pipeline
        .run(
            SourceImage::new("logo.png", sample_png()),
            OperationKind::All,
            &iconkit_core::CancellationToken::new(),
        )
        .await
        .unwrap();

    // the script stops at 256, so 512 and 1024 are missing
    assert_eq!(report.artifact_count, 14);
    assert!(report.is_partial());
    let names = entry_names(&s.sink.last().unwrap().bytes);
    assert_eq!(&names[..3], &["logo.icns", "logo.ico", "16.png"]);
    assert_eq!(names.last().unwrap(), "256.png");
}

#[tokio::test]
async fn test_per_request_run_leaves_root_clean() {
    let s = setup(PipelineConfig::default().with_namespace(NamespaceScope::PerRequest)).await;

    let report = s
        .pipeline
        .convert_to_pngs(SourceImage::new("logo.png", sample_png()))
        .await
        .unwrap();

    assert_eq!(report.artifact_count, 12);
    assert!(files_under(s.engine.root()).is_empty());
}

#[tokio::test]
async fn test_per_request_all_formats_collects_root_pngs() {
    let s = setup(PipelineConfig::default().with_namespace(NamespaceScope::PerRequest)).await;

    let report = s
        .pipeline
        .convert_to_all(SourceImage::new("logo.png", sample_png()))
        .await
        .unwrap();

    assert_eq!(report.artifact_count, 14);
    let names = entry_names(&s.sink.last().unwrap().bytes);
    assert_eq!(&names[..3], &["logo.icns", "logo.ico", "16.png"]);
    assert!(files_under(s.engine.root()).is_empty());
}

#[tokio::test]
async fn test_failing_converter_status_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("broken.sh");
    std::fs::write(&script, "#!/bin/sh\nexit 5\n").unwrap();
    let engine = ProcessEngine::new("sh")
        .unwrap()
        .with_leading_args([script.display().to_string()]);
    let session = Arc::new(EngineSession::new(engine));
    session.initialize().await.unwrap();
    let sink = Arc::new(MemorySink::new());
    let pipeline =
        iconkit_core::ConversionPipeline::new(session, sink.clone(), PipelineConfig::default())
            .unwrap();

    let err = pipeline
        .convert_to_icns(SourceImage::new("logo.png", sample_png()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ConversionFailed {
            operation: "wasm_convert_to_icns",
            code: 5
        }
    ));
    assert!(sink.is_empty());
}
