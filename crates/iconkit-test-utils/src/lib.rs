//! Testing utilities for iconkit workspace
//!
//! Scripted engine, recording sink and fixtures.

#![allow(missing_docs)]

use iconkit_core::{
    ConversionEngine, ConversionPipeline, Delivery, DeliveryError, DeliverySink, EngineError,
    EngineSession, MemoryNamespace, PipelineConfig, SourceImage, ICON_RESOLUTIONS,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Bytes that start like a PNG
#[must_use]
pub fn sample_png() -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(b"\0\0\0\rIHDR\0\0\x02\0\0\0\x02\0");
    bytes
}

pub fn sample_source(name: &str) -> SourceImage {
    SourceImage::new(name, sample_png())
}

/// What the scripted engine writes for each output
pub fn fake_ico(input: &[u8]) -> Vec<u8> {
    [&[0, 0, 1, 0][..], input].concat()
}

pub fn fake_icns(input: &[u8]) -> Vec<u8> {
    [&b"icns"[..], input].concat()
}

pub fn fake_png(size: u32) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&size.to_be_bytes());
    bytes
}

/// In-memory engine that emulates the four native operations
///
/// Reads its input from the namespace and writes outputs where the real
/// engine would, minus whatever it was told to leave out. PNG sets always
/// land at the root as `/{size}.png`, whatever the input path.
#[derive(Debug)]
pub struct ScriptedEngine {
    files: MemoryNamespace,
    resolutions: Vec<u32>,
    status: i32,
    missing_sizes: HashSet<u32>,
    skip_containers: bool,
    delay: Option<Duration>,
    fail_init: bool,
    fail_writes: bool,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            files: MemoryNamespace::new(),
            resolutions: ICON_RESOLUTIONS.to_vec(),
            status: 0,
            missing_sizes: HashSet::new(),
            skip_containers: false,
            delay: None,
            fail_init: false,
            fail_writes: false,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `status` from every call without writing anything
    pub fn with_status(mut self, status: i32) -> Self {
        self.status = status;
        self
    }

    /// Leave these PNG sizes unwritten
    pub fn with_missing_sizes(mut self, sizes: impl IntoIterator<Item = u32>) -> Self {
        self.missing_sizes = sizes.into_iter().collect();
        self
    }

    /// Leave ICO and ICNS files unwritten
    pub fn without_containers(mut self) -> Self {
        self.skip_containers = true;
        self
    }

    /// Sleep before every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Refuse every `write_file` from callers
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn namespace(&self) -> &MemoryNamespace {
        &self.files
    }

    /// Every call made so far, as `(operation, args)`
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }

    /// Most native calls ever running at once
    pub fn peak_concurrent_calls(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn convert(&self, operation: &str, args: &[&str]) -> Result<i32, EngineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.status != 0 {
            return Ok(self.status);
        }

        let bad_args = || EngineError::Call {
            operation: operation.to_string(),
            message: format!("unexpected arguments {args:?}"),
        };
        let input_path = *args.first().ok_or_else(bad_args)?;
        let Some(input) = self.files.read(input_path)? else {
            return Ok(2);
        };

        match (operation, args) {
            ("wasm_convert_to_ico", [_, output]) => self.write_container(output, fake_ico(&input))?,
            ("wasm_convert_to_icns", [_, output]) => self.write_container(output, fake_icns(&input))?,
            ("wasm_convert_to_pngs", [_]) => self.write_pngs()?,
            ("wasm_convert_to_both", [_, prefix]) => {
                self.write_container(&format!("{prefix}.icns"), fake_icns(&input))?;
                self.write_container(&format!("{prefix}.ico"), fake_ico(&input))?;
                self.write_pngs()?;
            }
            _ => return Err(bad_args()),
        }
        Ok(0)
    }

    fn write_container(&self, path: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        if self.skip_containers {
            return Ok(());
        }
        self.files.write(path, &bytes)
    }

    fn write_pngs(&self) -> Result<(), EngineError> {
        for &size in &self.resolutions {
            if !self.missing_sizes.contains(&size) {
                self.files.write(&format!("/{size}.png"), &fake_png(size))?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversionEngine for ScriptedEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        if self.fail_init {
            return Err(EngineError::InitFailed("scripted failure".into()));
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        if self.fail_writes {
            return Err(EngineError::Io {
                path: path.to_string(),
                source: std::io::Error::other("namespace full"),
            });
        }
        self.files.write(path, data)
    }

    async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, EngineError> {
        self.files.read(path)
    }

    async fn remove_file(&self, path: &str) -> Result<(), EngineError> {
        self.files.remove(path)
    }

    async fn call(&self, operation: &str, args: &[&str]) -> Result<i32, EngineError> {
        self.calls.lock().push((
            operation.to_string(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.convert(operation, args).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Sink that keeps every delivery in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that refuses everything
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn last(&self) -> Option<Delivery> {
        self.deliveries.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl DeliverySink for MemorySink {
    async fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        if self.reject {
            return Err(DeliveryError::Rejected(delivery.file_name));
        }
        self.deliveries.lock().push(delivery);
        Ok(())
    }
}

/// Pipeline wired to a scripted engine and a memory sink
pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub session: Arc<EngineSession>,
    pub sink: Arc<MemorySink>,
    pub pipeline: ConversionPipeline,
}

/// Initialized harness around `engine`
pub async fn harness(engine: ScriptedEngine, config: PipelineConfig) -> Harness {
    harness_with_sink(engine, MemorySink::new(), config).await
}

/// Initialized harness delivering into `sink`
pub async fn harness_with_sink(
    engine: ScriptedEngine,
    sink: MemorySink,
    config: PipelineConfig,
) -> Harness {
    let harness = harness_without_init(engine, sink, config);
    harness.session.initialize().await.unwrap();
    harness
}

/// Harness whose session has not been initialized
pub fn harness_without_init(
    engine: ScriptedEngine,
    sink: MemorySink,
    config: PipelineConfig,
) -> Harness {
    let engine = Arc::new(engine);
    let session = Arc::new(EngineSession::from_arc(engine.clone()));
    let sink = Arc::new(sink);
    let pipeline = ConversionPipeline::new(session.clone(), sink.clone(), config).unwrap();
    Harness {
        engine,
        session,
        sink,
        pipeline,
    }
}
