//! Per-user session state and event handlers.
//!
//! Each user action is an [`Event`]. [`Session::handle`] applies it to the
//! session state and re-derives the [`View`] from the memoized pipeline.
//! Handlers never fail: every pipeline error becomes a non-fatal view.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dashboard::Dashboard;
use crate::error::TrackError;
use crate::loader::HDOP_THRESHOLD;
use crate::model::{FilteredTrack, Subject, TimeSpan};
use crate::render::{Figure, RenderSpec, Style, TileLayer};

pub const NO_DATA_NOTICE: &str = "There are no data points for the selected date";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Search(String),
    SelectDate(NaiveDate),
    SetStyle(Style),
    SetColor(String),
    SetZoom(f64),
    SetMidpoint(u8),
    SetTiles(TileLayer),
    Back,
}

#[derive(Debug, Clone)]
pub struct TrackView {
    pub subject: Subject,
    pub dates: Arc<Vec<NaiveDate>>,
    pub date: NaiveDate,
    pub span: TimeSpan,
    pub track: Arc<FilteredTrack>,
    pub figure: Arc<Figure>,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub enum View {
    /// Nothing selected yet; the names a search may match.
    Search { visible: BTreeSet<String> },
    /// The typed name matches no visible subject.
    Invalid { name: String, message: String },
    /// The subject exists but has no tracking partition.
    Unavailable { subject: String, message: String },
    /// The subject has no usable samples for the chosen date.
    NoData {
        subject: Subject,
        dates: Arc<Vec<NaiveDate>>,
        date: Option<NaiveDate>,
    },
    Track(Box<TrackView>),
    /// Any other pipeline failure.
    Failed { message: String },
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Search { visible } => {
                write!(f, "Search a subject by name ({} available)", visible.len())
            }
            View::Invalid { message, .. } | View::Unavailable { message, .. } => {
                write!(f, "{message}")
            }
            View::NoData { subject, date, .. } => match date {
                Some(d) => write!(f, "{}, {d}: {NO_DATA_NOTICE}", subject.display_name()),
                None => write!(f, "{}: {NO_DATA_NOTICE}", subject.display_name()),
            },
            View::Track(view) => {
                writeln!(f, "GPS coordinates of {} on {}", view.subject.display_name(), view.date)?;
                writeln!(f, "{}*", view.span)?;
                write!(
                    f,
                    "*Only high-quality data points are shown (HDOP < {HDOP_THRESHOLD})"
                )
            }
            View::Failed { message } => write!(f, "Something went wrong: {message}"),
        }
    }
}

/// What one user currently has selected.
#[derive(Debug, Clone, Default)]
pub struct Session {
    subject: Option<Subject>,
    date: Option<NaiveDate>,
    render: RenderSpec,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn render_spec(&self) -> &RenderSpec {
        &self.render
    }

    /// Applies `event` and returns the resulting view.
    pub async fn handle(&mut self, dash: &Dashboard, event: Event) -> View {
        match event {
            Event::Search(name) => match dash.resolve(&name).await {
                Ok(Some(subject)) => {
                    info!(subject_id = %subject.id, "Subject selected");
                    dash.probe_image(&subject.name);
                    self.subject = Some(subject);
                    self.date = None;
                }
                Ok(None) => {
                    self.subject = None;
                    self.date = None;
                }
                Err(TrackError::NotFound { name }) => {
                    warn!(name = %name, "Search matched no subject");
                    self.subject = None;
                    self.date = None;
                    return View::Invalid {
                        message: format!("No subject named `{name}`"),
                        name,
                    };
                }
                Err(e) => return failed(e),
            },
            Event::SelectDate(date) => self.date = Some(date),
            Event::SetStyle(style) => self.render.style = style,
            Event::SetColor(color) => self.render.color = color,
            Event::SetZoom(zoom) => self.render.zoom = zoom,
            Event::SetMidpoint(midpoint) => self.render.density_midpoint = Some(midpoint),
            Event::SetTiles(tiles) => self.render.tile_url = tiles.url_template(),
            Event::Back => {
                self.subject = None;
                self.date = None;
            }
        }
        self.refresh(dash).await
    }

    /// Derives the view for the current state.
    pub async fn refresh(&mut self, dash: &Dashboard) -> View {
        let Some(subject) = self.subject.clone() else {
            return match dash.list_visible().await {
                Ok(visible) => View::Search { visible },
                Err(e) => failed(e),
            };
        };

        let dates = match dash.available_dates(&subject.id).await {
            Ok(dates) => dates,
            Err(e) => return unavailable_or_failed(e, &subject),
        };

        // Default to the earliest date, as a date picker would.
        let Some(date) = self.date.or_else(|| dates.first().copied()) else {
            return View::NoData {
                subject,
                dates,
                date: None,
            };
        };
        self.date = Some(date);

        let track = match dash.track(&subject.id, date).await {
            Ok(track) => track,
            Err(e) => return unavailable_or_failed(e, &subject),
        };

        let Some(span) = track.time_span() else {
            return View::NoData {
                subject,
                dates,
                date: Some(date),
            };
        };

        match dash.figure(&track, &self.render) {
            Ok(figure) => View::Track(Box::new(TrackView {
                image_url: dash.image_url(&subject.name),
                subject,
                dates,
                date,
                span,
                track,
                figure,
            })),
            Err(e) => failed(e),
        }
    }
}

fn unavailable_or_failed(err: TrackError, subject: &Subject) -> View {
    match err {
        TrackError::DataUnavailable { subject_id } => {
            warn!(subject_id = %subject_id, "Tracking data unavailable");
            View::Unavailable {
                subject: subject.display_name(),
                message: format!(
                    "Tracking data for {} is not available",
                    subject.display_name()
                ),
            }
        }
        other => failed(other),
    }
}

fn failed(err: TrackError) -> View {
    warn!(error = %err, "Pipeline request failed");
    View::Failed {
        message: err.to_string(),
    }
}
