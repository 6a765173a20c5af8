//! Shared test helpers: a tiny valid PNG and a scripted DiseaseService.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use leafguard_lib::image_input::ImageReference;
use leafguard_lib::llm::{
    DetectionRequest, DetectionResult, DiseaseService, SummaryRequest, SummaryResult,
};
use leafguard_lib::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// 1x1 PNG.
pub const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn tiny_png() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(TINY_PNG_B64)
        .unwrap()
}

pub fn leaf_image() -> ImageReference {
    ImageReference::from_bytes(&tiny_png()).unwrap()
}

/// What the scripted service answers.
#[derive(Debug, Clone)]
pub enum Script {
    Healthy,
    Diseased { name: String, confidence: f64 },
    DetectFails,
    SummaryFails,
}

pub struct ScriptedService {
    script: Script,
    pub detect_calls: AtomicUsize,
    pub summary_calls: Mutex<Vec<String>>,
    /// When set, DETECT waits for a permit before answering.
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            detect_calls: AtomicUsize::new(0),
            summary_calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(script: Script, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    pub fn detect_count(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn summary_names(&self) -> Vec<String> {
        self.summary_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiseaseService for ScriptedService {
    async fn detect_disease(&self, _request: &DetectionRequest) -> Result<DetectionResult> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.script {
            Script::Healthy => Ok(DetectionResult::healthy()),
            Script::Diseased { name, confidence } => DetectionResult::diseased(name.clone(), *confidence),
            Script::DetectFails => Err(Error::MalformedOutput("scripted failure".to_string())),
            Script::SummaryFails => DetectionResult::diseased("Powdery Mildew", 0.6),
        }
    }

    async fn summarize_disease_info(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        self.summary_calls
            .lock()
            .unwrap()
            .push(request.disease_name().to_string());
        match &self.script {
            Script::SummaryFails => Err(Error::MalformedOutput("scripted failure".to_string())),
            _ => Ok(SummaryResult {
                summary: format!("{}: spots on leaves; prune and apply fungicide.", request.disease_name()),
            }),
        }
    }
}
