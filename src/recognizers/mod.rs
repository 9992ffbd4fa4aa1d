//! Recognizer implementations
//!
//! This module contains implementations of the Recognizer trait for different
//! backends. The neural `ocrs` backend is compiled in with the `engine-ocrs`
//! feature; the `command` backend is always available.

pub mod command;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::config::Config;
use crate::error::InkMathError;
use crate::recognition::Recognizer;
use serde::Serialize;
use std::sync::Arc;

/// Recognizer backends selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecognizerKind {
    /// Pure Rust neural OCR
    Ocrs,
    /// External program reading a PNG and printing LaTeX
    Command,
}

/// Information about an available recognizer
#[derive(Debug, Clone, Serialize)]
pub struct RecognizerInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry of initialized recognizers
pub struct RecognizerRegistry {
    recognizers: Vec<Arc<dyn Recognizer>>,
    default_recognizer: String,
}

impl RecognizerRegistry {
    /// Initialize every configured recognizer, in order
    pub fn new(config: &Config) -> Result<Self, InkMathError> {
        let mut recognizers: Vec<Arc<dyn Recognizer>> = Vec::new();

        for kind in &config.recognizers {
            match kind {
                RecognizerKind::Ocrs => recognizers.push(ocrs_recognizer(config)?),
                RecognizerKind::Command => {
                    tracing::info!("Initializing command recognizer...");
                    recognizers.push(Arc::new(command::CommandRecognizer::from_config(config)?));
                }
            }
        }

        Self::from_recognizers(recognizers)
    }

    /// Build a registry from already constructed recognizers; the first one
    /// becomes the default
    pub fn from_recognizers(recognizers: Vec<Arc<dyn Recognizer>>) -> Result<Self, InkMathError> {
        let default_recognizer = recognizers
            .first()
            .map(|r| r.name().to_string())
            .ok_or_else(|| InkMathError::Initialization("No recognizers configured".to_string()))?;

        Ok(Self {
            recognizers,
            default_recognizer,
        })
    }

    /// Get a recognizer by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Recognizer>> {
        self.recognizers.iter().find(|r| r.name() == name).cloned()
    }

    /// Get the default recognizer
    pub fn default(&self) -> Option<Arc<dyn Recognizer>> {
        self.get(&self.default_recognizer)
    }

    /// The named recognizer, or the default one when no name is given
    pub fn select(&self, name: Option<&str>) -> Result<Arc<dyn Recognizer>, InkMathError> {
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| InkMathError::UnknownRecognizer(name.to_string())),
            None => self
                .default()
                .ok_or_else(|| InkMathError::Internal("default recognizer missing".to_string())),
        }
    }

    /// Get the default recognizer name
    pub fn default_name(&self) -> &str {
        &self.default_recognizer
    }

    /// List all available recognizer names
    pub fn list(&self) -> Vec<&str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// Get info about all available recognizers
    pub fn info(&self) -> Vec<RecognizerInfo> {
        self.recognizers
            .iter()
            .map(|r| RecognizerInfo {
                name: r.name(),
                description: r.description(),
            })
            .collect()
    }
}

#[cfg(feature = "engine-ocrs")]
fn ocrs_recognizer(config: &Config) -> Result<Arc<dyn Recognizer>, InkMathError> {
    tracing::info!("Initializing ocrs recognizer...");
    Ok(Arc::new(ocrs::OcrsRecognizer::new(config)?))
}

#[cfg(not(feature = "engine-ocrs"))]
fn ocrs_recognizer(_config: &Config) -> Result<Arc<dyn Recognizer>, InkMathError> {
    Err(InkMathError::Initialization(
        "ocrs recognizer not available. Build with --features engine-ocrs".to_string(),
    ))
}
