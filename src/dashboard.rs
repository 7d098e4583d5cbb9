//! Long-lived application context for the query, filter, and render pipeline.
//!
//! [`Dashboard`] owns the two data stores and one [`MemoCache`] per pipeline
//! step, so repeated interactions reuse earlier query results and figures.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::cache::MemoCache;
use crate::catalog::SubjectCatalog;
use crate::config::Config;
use crate::error::{TrackError, TrackResult};
use crate::fetch::{BasicClient, HttpClient, image_url, spawn_image_probe};
use crate::filter;
use crate::loader;
use crate::model::{FilteredTrack, Subject, SubjectId};
use crate::render::{self, Figure, RenderSpec, Style};
use crate::store::{DataStore, PgStore};

/// Cache key for a rendered figure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FigureKey {
    subject_id: SubjectId,
    date: NaiveDate,
    style: Style,
    color: String,
    zoom_bits: u64,
    tile_url: String,
    midpoint: Option<u8>,
}

impl FigureKey {
    fn new(track: &FilteredTrack, spec: &RenderSpec) -> Self {
        Self {
            subject_id: track.subject_id.clone(),
            date: track.date,
            style: spec.style,
            color: spec.color.clone(),
            zoom_bits: spec.zoom.to_bits(),
            tile_url: spec.tile_url.clone(),
            midpoint: (spec.style == Style::Density).then(|| spec.midpoint()),
        }
    }
}

pub struct Dashboard {
    catalog_store: Arc<dyn DataStore>,
    gps_store: Arc<dyn DataStore>,
    http: Option<Arc<dyn HttpClient>>,
    image_base_url: String,
    catalog: MemoCache<(), SubjectCatalog>,
    dates: MemoCache<SubjectId, Vec<NaiveDate>>,
    tracks: MemoCache<(SubjectId, NaiveDate), FilteredTrack>,
    figures: MemoCache<FigureKey, Figure>,
}

impl Dashboard {
    pub fn new(catalog_store: Arc<dyn DataStore>, gps_store: Arc<dyn DataStore>) -> Self {
        Self {
            catalog_store,
            gps_store,
            http: None,
            image_base_url: crate::config::DEFAULT_IMAGE_BASE_URL.to_string(),
            catalog: MemoCache::new("catalog"),
            dates: MemoCache::new("dates"),
            tracks: MemoCache::new("tracks"),
            figures: MemoCache::new("figures"),
        }
    }

    /// Enables the background subject-image probe.
    pub fn with_image_probe(mut self, client: Arc<dyn HttpClient>, base_url: &str) -> Self {
        self.http = Some(client);
        self.image_base_url = base_url.to_string();
        self
    }

    /// Connects to the catalog and GPS databases named in `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = config.database_url()?;
        let cert = config.ssl_root_cert.as_deref();

        let catalog = PgStore::connect(url, &config.catalog_db, cert)
            .await
            .with_context(|| format!("connecting to catalog database `{}`", config.catalog_db))?;
        let gps = PgStore::connect(url, &config.gps_db, cert)
            .await
            .with_context(|| format!("connecting to GPS database `{}`", config.gps_db))?;
        let http = BasicClient::with_timeout(Duration::from_secs(10))?;

        info!(catalog_db = %config.catalog_db, gps_db = %config.gps_db, "Databases connected");
        Ok(Self::new(Arc::new(catalog), Arc::new(gps))
            .with_image_probe(Arc::new(http), &config.image_base_url))
    }

    pub async fn catalog(&self) -> TrackResult<Arc<SubjectCatalog>> {
        self.catalog
            .get_or_try_insert_async((), || SubjectCatalog::load(self.catalog_store.as_ref()))
            .await
    }

    pub async fn list_visible(&self) -> TrackResult<BTreeSet<String>> {
        Ok(self.catalog().await?.list_visible())
    }

    /// Resolves a typed name to a visible subject; blank input is `Ok(None)`.
    pub async fn resolve(&self, name: &str) -> TrackResult<Option<Subject>> {
        Ok(self.catalog().await?.resolve(name)?.cloned())
    }

    pub async fn available_dates(&self, subject_id: &SubjectId) -> TrackResult<Arc<Vec<NaiveDate>>> {
        self.dates
            .get_or_try_insert_async(subject_id.clone(), || {
                loader::list_available_dates(self.gps_store.as_ref(), subject_id)
            })
            .await
    }

    /// Loads and outlier-filters the samples for `subject_id` on `date`.
    #[instrument(skip(self), fields(subject_id = %subject_id, date = %date))]
    pub async fn track(&self, subject_id: &SubjectId, date: NaiveDate) -> TrackResult<Arc<FilteredTrack>> {
        self.tracks
            .get_or_try_insert_async((subject_id.clone(), date), || async {
                let raw = loader::load_samples(self.gps_store.as_ref(), subject_id, date).await?;
                let loaded = raw.len();
                let track = FilteredTrack::new(subject_id.clone(), date, filter::filter(raw));
                debug!(loaded, kept = track.len(), "Track prepared");
                Ok::<_, TrackError>(track)
            })
            .await
    }

    pub fn figure(&self, track: &FilteredTrack, spec: &RenderSpec) -> TrackResult<Arc<Figure>> {
        self.figures
            .get_or_try_insert_with(FigureKey::new(track, spec), || render::render(track, spec))
    }

    pub fn image_url(&self, name: &str) -> String {
        image_url(&self.image_base_url, name)
    }

    /// Starts a detached probe of the subject's image, if probing is enabled.
    pub fn probe_image(&self, name: &str) {
        if let Some(client) = &self.http {
            drop(spawn_image_probe(client.clone(), self.image_url(name)));
        }
    }

    /// `(hits, misses)` of the figure cache.
    pub fn figure_cache_stats(&self) -> (u64, u64) {
        self.figures.stats()
    }
}
