//! Map figure construction for a filtered track.
//!
//! A [`Figure`] is a serde-serializable description in Plotly's mapbox
//! vocabulary: one data trace chosen by [`Style`], plus a layout that hides
//! the base map and injects a single raster [`TileLayer`] below the traces.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{TrackError, TrackResult};
use crate::model::FilteredTrack;

pub const DEFAULT_COLOR: &str = "#C81E00";
pub const DEFAULT_ZOOM: f64 = 15.5;
pub const DEFAULT_DENSITY_MIDPOINT: u8 = 10;
pub const MAX_DENSITY_MIDPOINT: u8 = 50;
pub const FIGURE_HEIGHT: u32 = 500;
pub const DENSITY_OPACITY: f64 = 0.6;

/// Plotly's sequential "Rainbow" scale.
pub const RAINBOW: [&str; 9] = [
    "rgb(150,0,90)",
    "rgb(0,0,200)",
    "rgb(0,25,255)",
    "rgb(0,152,255)",
    "rgb(44,255,150)",
    "rgb(151,255,0)",
    "rgb(255,234,0)",
    "rgb(255,111,0)",
    "rgb(255,0,0)",
];

const TILE_ATTRIBUTION: &str = "Google Maps, ©2021 Google";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Line,
    Scatter,
    Density,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Line, Style::Scatter, Style::Density];
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Style::Line => "line",
            Style::Scatter => "scatter",
            Style::Density => "density",
        })
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(Style::Line),
            "scatter" => Ok(Style::Scatter),
            "density" => Ok(Style::Density),
            other => Err(format!(
                "unknown style `{other}` (expected line, scatter or density)"
            )),
        }
    }
}

/// Raster tile sources offered for the map background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileLayer {
    #[default]
    Satellite,
    Roadmap,
    Terrain,
    AlteredRoadmap,
    Hybrid,
}

impl TileLayer {
    pub const ALL: [TileLayer; 5] = [
        TileLayer::Satellite,
        TileLayer::Roadmap,
        TileLayer::Terrain,
        TileLayer::AlteredRoadmap,
        TileLayer::Hybrid,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TileLayer::Satellite => "Satellite only",
            TileLayer::Roadmap => "Roadmap",
            TileLayer::Terrain => "Terrain",
            TileLayer::AlteredRoadmap => "Altered roadmap",
            TileLayer::Hybrid => "Hybrid",
        }
    }

    /// XYZ URL template for this layer.
    pub fn url_template(&self) -> String {
        let code = match self {
            TileLayer::Satellite => 's',
            TileLayer::Roadmap => 'm',
            TileLayer::Terrain => 'p',
            TileLayer::AlteredRoadmap => 'r',
            TileLayer::Hybrid => 'y',
        };
        format!("https://mt0.google.com/vt/lyrs={code}&hl=en&x={{x}}&y={{y}}&z={{z}}")
    }
}

impl FromStr for TileLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        TileLayer::ALL
            .into_iter()
            .find(|t| {
                let label = t.label().to_lowercase();
                label == wanted || label.split(' ').next() == Some(wanted.as_str())
            })
            .ok_or_else(|| format!("unknown tile layer `{s}`"))
    }
}

/// Rendering parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    pub style: Style,
    /// Trace colour for line and scatter styles.
    pub color: String,
    pub zoom: f64,
    pub tile_url: String,
    /// Colour-scale midpoint for the density style; `None` means the default.
    pub density_midpoint: Option<u8>,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            style: Style::default(),
            color: DEFAULT_COLOR.to_string(),
            zoom: DEFAULT_ZOOM,
            tile_url: TileLayer::default().url_template(),
            density_midpoint: None,
        }
    }
}

impl RenderSpec {
    pub fn midpoint(&self) -> u8 {
        self.density_midpoint.unwrap_or(DEFAULT_DENSITY_MIDPOINT)
    }

    pub fn validate(&self) -> TrackResult<()> {
        if self.color.trim().is_empty() {
            return Err(TrackError::InvalidRenderSpec("color is empty".into()));
        }
        if !self.zoom.is_finite() || self.zoom < 0.0 {
            return Err(TrackError::InvalidRenderSpec(format!(
                "zoom {} is not a non-negative number",
                self.zoom
            )));
        }
        if self.midpoint() > MAX_DENSITY_MIDPOINT {
            return Err(TrackError::InvalidRenderSpec(format!(
                "density midpoint {} is outside 0..={MAX_DENSITY_MIDPOINT}",
                self.midpoint()
            )));
        }
        if self.tile_url.trim().is_empty() {
            return Err(TrackError::InvalidRenderSpec("tile URL is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scattermapbox {
        mode: &'static str,
        lat: Vec<f64>,
        lon: Vec<f64>,
        hovertext: Vec<String>,
        customdata: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<ColorSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<ColorSpec>,
    },
    Densitymapbox {
        lat: Vec<f64>,
        lon: Vec<f64>,
        hovertext: Vec<String>,
        customdata: Vec<String>,
        opacity: f64,
        coloraxis: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorSpec {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub height: u32,
    pub margin: Margin,
    pub mapbox: Mapbox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coloraxis: Option<ColorAxis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub r: u32,
    pub t: u32,
    pub l: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapbox {
    pub style: &'static str,
    pub zoom: f64,
    pub center: Center,
    pub layers: Vec<MapLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub below: &'static str,
    pub sourcetype: &'static str,
    pub sourceattribution: &'static str,
    pub source: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorAxis {
    pub colorscale: Vec<(f64, &'static str)>,
    pub cmid: f64,
}

/// Builds the figure for `track` as described by `spec`.
pub fn render(track: &FilteredTrack, spec: &RenderSpec) -> TrackResult<Figure> {
    spec.validate()?;

    let lat: Vec<f64> = track.samples().iter().map(|s| s.latitude).collect();
    let lon: Vec<f64> = track.samples().iter().map(|s| s.longitude).collect();
    let times: Vec<String> = track.samples().iter().map(|s| s.time().to_string()).collect();
    let center = center_of(&lat, &lon);

    let (trace, coloraxis) = match spec.style {
        Style::Line | Style::Scatter => {
            let color = Some(ColorSpec {
                color: spec.color.clone(),
            });
            let (mode, line, marker) = if spec.style == Style::Line {
                ("lines", color, None)
            } else {
                ("markers", None, color)
            };
            let trace = Trace::Scattermapbox {
                mode,
                lat,
                lon,
                hovertext: times.clone(),
                customdata: times,
                line,
                marker,
            };
            (trace, None)
        }
        Style::Density => {
            let trace = Trace::Densitymapbox {
                lat,
                lon,
                hovertext: times.clone(),
                customdata: times,
                opacity: DENSITY_OPACITY,
                coloraxis: "coloraxis",
            };
            (trace, Some(rainbow_axis(spec.midpoint())))
        }
    };

    Ok(Figure {
        data: vec![trace],
        layout: Layout {
            height: FIGURE_HEIGHT,
            margin: Margin {
                r: 0,
                t: 0,
                l: 0,
                b: 0,
            },
            mapbox: Mapbox {
                style: "white-bg",
                zoom: spec.zoom,
                center,
                layers: vec![MapLayer {
                    below: "traces",
                    sourcetype: "raster",
                    sourceattribution: TILE_ATTRIBUTION,
                    source: vec![spec.tile_url.clone()],
                }],
            },
            coloraxis,
        },
    })
}

fn rainbow_axis(midpoint: u8) -> ColorAxis {
    let last = (RAINBOW.len() - 1) as f64;
    ColorAxis {
        colorscale: RAINBOW
            .iter()
            .enumerate()
            .map(|(i, c)| (i as f64 / last, *c))
            .collect(),
        cmid: f64::from(midpoint),
    }
}

fn center_of(lat: &[f64], lon: &[f64]) -> Center {
    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };
    Center {
        lat: mean(lat),
        lon: mean(lon),
    }
}
