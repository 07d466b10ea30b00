//! Fill styles: solid colours and vertical gradients.

use serde::{Deserialize, Serialize};
use waveview_core::{Result, WaveviewError};

/// A colour option as configured: one CSS colour or a list of gradient stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Solid(String),
    Gradient(Vec<String>),
}

impl ColorSpec {
    pub fn solid(color: impl Into<String>) -> Self {
        ColorSpec::Solid(color.into())
    }

    pub fn gradient<S: Into<String>>(stops: impl IntoIterator<Item = S>) -> Self {
        ColorSpec::Gradient(stops.into_iter().map(Into::into).collect())
    }

    /// Check that the colour can be resolved.
    pub fn validate(&self) -> Result<()> {
        match self {
            ColorSpec::Gradient(stops) if stops.is_empty() => {
                Err(WaveviewError::Config("gradient needs at least one colour stop".into()))
            }
            _ => Ok(()),
        }
    }

    /// Resolve against a canvas of `height` px. Gradients run top to bottom
    /// with evenly spread stops.
    pub fn resolve(&self, height: f64) -> Result<FillStyle> {
        match self {
            ColorSpec::Solid(color) => Ok(FillStyle::Color(color.clone())),
            ColorSpec::Gradient(stops) => match stops.as_slice() {
                [] => Err(WaveviewError::Config("gradient needs at least one colour stop".into())),
                [only] => Ok(FillStyle::Color(only.clone())),
                _ => {
                    let last = (stops.len() - 1) as f64;
                    let stops = stops
                        .iter()
                        .enumerate()
                        .map(|(i, color)| ColorStop {
                            offset: i as f64 / last,
                            color: color.clone(),
                        })
                        .collect();
                    Ok(FillStyle::LinearGradient(LinearGradient {
                        x0: 0.0,
                        y0: 0.0,
                        x1: 0.0,
                        y1: height,
                        stops,
                    }))
                }
            },
        }
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Solid("#999".into())
    }
}

impl From<&str> for ColorSpec {
    fn from(color: &str) -> Self {
        ColorSpec::Solid(color.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub stops: Vec<ColorStop>,
}

/// A resolved canvas fill style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillStyle {
    Color(String),
    LinearGradient(LinearGradient),
}
