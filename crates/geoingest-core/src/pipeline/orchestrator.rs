use std::sync::Arc;

use tracing::{info, warn};

use crate::compose::compose;
use crate::error::{IngestError, Result, StageError};
use crate::io::image_io::{save_composite, save_thumbnail};
use crate::io::{EnviReader, RpcModel};
use crate::metadata::{extract_metadata, CaptureFacts};
use crate::raster::RasterBuffer;
use crate::sensor::{classify, SensorEvidence};
use crate::tiles::{composite_bounds, generate_pyramid, zoom_range, TileOptions};
use crate::warp::{correct, reproject, SourceGeoref};

use super::artifacts::ArtifactStaging;
use super::cancel::CancelToken;
use super::config::IngestConfig;
use super::state::{Classified, Composited, Corrected, IngestState, Loaded, Reprojected, Tiled};
use super::types::{Capture, IngestOutput, NoOpReporter, PipelineStage, ProgressReporter};

const COMPOSITE_FILE: &str = "composite.png";
const THUMBNAIL_FILE: &str = "thumbnail.png";
const METADATA_FILE: &str = "metadata.json";
const TILES_DIR: &str = "tiles";

/// One ingestion, advanced one stage at a time.
pub struct Ingestion {
    capture: Capture,
    config: IngestConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancelToken,
    state: IngestState,
}

impl Ingestion {
    pub fn new(capture: Capture, config: IngestConfig) -> Self {
        Self::with_reporter(capture, config, Arc::new(NoOpReporter), CancelToken::new())
    }

    pub fn with_reporter(
        capture: Capture,
        config: IngestConfig,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            capture,
            config,
            reporter,
            cancel,
            state: IngestState::Pending,
        }
    }

    pub fn state(&self) -> &IngestState {
        &self.state
    }

    /// Run the next stage. Returns `false` once a terminal state is reached.
    pub fn step(&mut self) -> bool {
        let Some(stage) = self.state.next_stage() else {
            return false;
        };
        let state = std::mem::replace(&mut self.state, IngestState::Pending);

        // Dropping `state` here discards anything it had staged.
        let outcome = if self.cancel.is_cancelled() {
            drop(state);
            Err(IngestError::Cancelled)
        } else {
            self.reporter.begin_stage(stage, None);
            let next = self.advance(state);
            self.reporter.finish_stage();
            next
        };

        self.state = match outcome {
            Ok(next) => next,
            Err(source) => {
                warn!(
                    capture = %self.capture.name(),
                    %stage,
                    kind = %source.kind(),
                    error = %source,
                    "Ingestion failed"
                );
                IngestState::Failed(StageError::new(stage, source))
            }
        };
        !self.state.is_terminal()
    }

    /// Drive the state machine to completion.
    pub fn run(mut self) -> std::result::Result<IngestOutput, StageError> {
        while self.step() {}
        match self.state {
            IngestState::Completed(output) => Ok(output),
            IngestState::Failed(err) => Err(err),
            // `step` only stops on a terminal state.
            other => Err(StageError::new(
                other.next_stage().unwrap_or(PipelineStage::Finalizing),
                IngestError::Cancelled,
            )),
        }
    }

    fn advance(&self, state: IngestState) -> Result<IngestState> {
        Ok(match state {
            IngestState::Pending => IngestState::Loaded(self.load()?),
            IngestState::Loaded(loaded) => IngestState::Classified(self.classify(loaded)),
            IngestState::Classified(c) => IngestState::Reprojected(self.reproject(c)?),
            IngestState::Reprojected(r) => IngestState::Corrected(self.correct(r)?),
            IngestState::Corrected(c) => IngestState::Composited(self.compose(c)?),
            IngestState::Composited(c) => IngestState::Tiled(self.tile(c)?),
            IngestState::Tiled(t) => IngestState::Completed(self.finalize(t)?),
            terminal => terminal,
        })
    }

    fn load(&self) -> Result<Loaded> {
        self.config.validate()?;
        let reader = EnviReader::open(&self.capture.header_path, &self.capture.payload_path)?;
        let mut raster = reader.read_raster()?;
        let header = reader.header;

        let rpc = match &self.capture.rpc_path {
            Some(path) => Some(RpcModel::open(path)?),
            None => header.rpc.clone(),
        };
        if raster.crs.is_none() {
            if let Some(rpc) = &rpc {
                let (geotransform, crs) = rpc.approximate_georef(raster.width(), raster.height());
                warn!(crs = %crs, "Capture has no map projection, using RPC extent as georeference");
                raster.geotransform = geotransform;
                raster.crs = Some(crs);
            }
        }

        info!(
            capture = %self.capture.name(),
            width = raster.width(),
            height = raster.height(),
            bands = raster.band_count(),
            data_type = ?raster.sample_type,
            crs = ?raster.crs,
            rpc = rpc.is_some(),
            "Loaded capture"
        );
        Ok(Loaded { raster, header, rpc })
    }

    fn classify(&self, loaded: Loaded) -> Classified {
        let name = self.capture.name();
        let evidence = SensorEvidence {
            hint: self.capture.sensor_hint.as_deref(),
            header_sensor: loaded.header.sensor_type.as_deref(),
            file_stem: Some(&name),
            band_count: loaded.raster.band_count(),
            wavelengths_nm: &loaded.header.wavelengths,
        };
        let profile = classify(&evidence);
        Classified {
            raster: loaded.raster,
            profile,
            rpc: loaded.rpc,
        }
    }

    fn reproject(&self, classified: Classified) -> Result<Reprojected> {
        let source_raster = &classified.raster;
        let raster = reproject(source_raster, self.config.resampling_method)?;
        let source = SourceGeoref {
            geotransform: source_raster.geotransform,
            crs: source_raster.crs.clone().unwrap_or_default(),
            width: source_raster.width(),
            height: source_raster.height(),
        };
        Ok(Reprojected {
            raster,
            source,
            profile: classified.profile,
            rpc: classified.rpc,
        })
    }

    fn correct(&self, reprojected: Reprojected) -> Result<Corrected> {
        let rpc_corrected = reprojected.rpc.is_some();
        let raster: RasterBuffer = correct(
            reprojected.raster,
            reprojected.rpc.as_ref(),
            &reprojected.source,
            self.config.resampling_method,
        )?;
        let facts = CaptureFacts {
            name: self.capture.name(),
            source_files: self.capture.source_files(),
            source_crs: Some(reprojected.source.crs.clone()),
            rpc_corrected,
        };
        let metadata = extract_metadata(&raster, &reprojected.profile, &facts);
        Ok(Corrected {
            raster,
            profile: reprojected.profile,
            metadata,
        })
    }

    fn compose(&self, corrected: Corrected) -> Result<Composited> {
        let composite = compose(&corrected.raster, &corrected.profile, &self.config.composite)?;
        let mut metadata = corrected.metadata;
        // An override replaces the sensor's default display bands.
        metadata.composite_bands = composite.bands.iter().map(|b| b + 1).collect();
        let staging = ArtifactStaging::create(&self.config.output_root, &self.capture.name())?;
        save_composite(&composite, &staging.path(COMPOSITE_FILE))?;
        if self.config.write_thumbnail {
            save_thumbnail(&composite, &staging.path(THUMBNAIL_FILE), self.config.thumbnail_size)?;
        }
        Ok(Composited {
            composite,
            metadata,
            staging,
        })
    }

    fn tile(&self, composited: Composited) -> Result<Tiled> {
        let composite = &composited.composite;
        let bbox = composite_bounds(composite);
        let (gsd, _) = composite.geotransform.pixel_size();
        let (min_zoom, max_zoom) = zoom_range(
            &bbox,
            gsd,
            self.config.tile_size,
            self.config.min_zoom,
            self.config.max_zoom,
        )?;
        let options = TileOptions {
            tile_size: self.config.tile_size,
            min_zoom,
            max_zoom,
            method: self.config.resampling_method,
            max_workers: self.config.max_workers,
        };
        let reporter = &self.reporter;
        let tile_root = composited.staging.path(TILES_DIR);
        let pyramid = generate_pyramid(composite, &tile_root, &options, |done| reporter.advance(done))?;
        Ok(Tiled {
            metadata: composited.metadata,
            pyramid,
            staging: composited.staging,
        })
    }

    fn finalize(&self, tiled: Tiled) -> Result<IngestOutput> {
        tiled.metadata.write_json(&tiled.staging.path(METADATA_FILE))?;
        let output_dir = tiled.staging.commit()?;

        let mut pyramid = tiled.pyramid;
        pyramid.relocate(output_dir.join(TILES_DIR));
        let thumbnail_path = self
            .config
            .write_thumbnail
            .then(|| output_dir.join(THUMBNAIL_FILE));
        info!(
            capture = %self.capture.name(),
            output = %output_dir.display(),
            tiles = pyramid.tile_count(),
            "Ingestion completed"
        );
        Ok(IngestOutput {
            composite_path: output_dir.join(COMPOSITE_FILE),
            thumbnail_path,
            tile_root_path: output_dir.join(TILES_DIR),
            metadata_path: output_dir.join(METADATA_FILE),
            metadata: tiled.metadata,
            pyramid,
            output_dir,
        })
    }
}

/// Ingest one capture with a thread-safe progress reporter and a
/// cancellation token checked between stages.
pub fn ingest_reported(
    capture: &Capture,
    config: &IngestConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelToken,
) -> std::result::Result<IngestOutput, StageError> {
    Ingestion::with_reporter(capture.clone(), config.clone(), reporter, cancel.clone()).run()
}

/// Ingest one capture: load, classify, reproject, correct, compose, tile
/// and publish its artifacts under `config.output_root/<name>`.
pub fn ingest(capture: &Capture, config: &IngestConfig) -> std::result::Result<IngestOutput, StageError> {
    ingest_reported(capture, config, Arc::new(NoOpReporter), &CancelToken::new())
}
