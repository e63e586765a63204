#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use label_image::{DType, EngineError, EngineOptions, InferenceEngine, Runtime, TensorDesc};

/// Counters shared between a scripted runtime and the engines it loads.
#[derive(Default)]
pub struct Calls {
    pub loads: AtomicUsize,
    pub copy_ins: AtomicUsize,
    pub invokes: AtomicUsize,
    pub overlaps: AtomicUsize,
    pub last_input: Mutex<Vec<u8>>,
}

/// In-memory runtime whose engine always produces `output`.
pub struct ScriptedRuntime {
    pub calls: Arc<Calls>,
    pub input: TensorDesc,
    pub output: TensorDesc,
    pub output_bytes: Vec<u8>,
    pub fail_loads: AtomicUsize,
    pub fail_invoke: bool,
    pub invoke_delay: Duration,
    pub load_delay: Duration,
    /// Reported through the engine options on every successful load.
    pub diagnostics: Vec<&'static str>,
}

impl ScriptedRuntime {
    pub fn new(output_bytes: Vec<u8>) -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            input: TensorDesc::new(DType::U8, &[1, 4, 4, 3]),
            output: TensorDesc::new(DType::U8, &[1, output_bytes.len()]),
            output_bytes,
            fail_loads: AtomicUsize::new(0),
            fail_invoke: false,
            invoke_delay: Duration::ZERO,
            load_delay: Duration::ZERO,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: TensorDesc) -> Self {
        self.input = input;
        self
    }
}

pub struct ScriptedEngine {
    calls: Arc<Calls>,
    input: TensorDesc,
    output: TensorDesc,
    output_bytes: Vec<u8>,
    fail_invoke: bool,
    invoke_delay: Duration,
    busy: AtomicBool,
}

impl Runtime for ScriptedRuntime {
    type Engine = ScriptedEngine;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&self, model_path: &Path, options: &EngineOptions) -> Result<ScriptedEngine, EngineError> {
        std::thread::sleep(self.load_delay);
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EngineError::ModelLoad(format!("{} is not a model", model_path.display())));
        }
        for msg in &self.diagnostics {
            (options.reporter)(msg);
        }
        Ok(ScriptedEngine {
            calls: Arc::clone(&self.calls),
            input: self.input.clone(),
            output: self.output.clone(),
            output_bytes: self.output_bytes.clone(),
            fail_invoke: self.fail_invoke,
            invoke_delay: self.invoke_delay,
            busy: AtomicBool::new(false),
        })
    }
}

impl InferenceEngine for ScriptedEngine {
    fn input(&self) -> &TensorDesc {
        &self.input
    }

    fn output(&self) -> &TensorDesc {
        &self.output
    }

    fn copy_in(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.calls.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.copy_ins.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_input.lock().unwrap() = bytes.to_vec();
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        self.calls.invokes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.invoke_delay);
        if self.fail_invoke {
            self.busy.store(false, Ordering::SeqCst);
            return Err(EngineError::Invoke("status 1".into()));
        }
        Ok(())
    }

    fn copy_out(&self, buf: &mut [u8]) -> Result<(), EngineError> {
        buf.copy_from_slice(&self.output_bytes[..buf.len()]);
        self.busy.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    encode(img, ImageFormat::Png)
}

/// 8-bit PNG with an alpha channel.
pub fn rgba_png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    encode(img, ImageFormat::Png)
}

/// 16 bits per channel PNG.
pub fn png16_bytes(width: u32, height: u32, color: [u16; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb16(ImageBuffer::from_pixel(width, height, Rgb(color)));
    encode(img, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    encode(img, ImageFormat::Jpeg)
}

pub fn label_file(name: &str, labels: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("label-image-{}-{}.txt", std::process::id(), name));
    std::fs::write(&path, labels.join("\n")).unwrap();
    path
}
