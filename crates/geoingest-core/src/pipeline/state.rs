//! Ingestion state machine.
//!
//! Each state owns exactly what the next stage consumes, so a stage can only
//! ever be fed the output of the one before it. Staged artifacts travel
//! with the state, so dropping a state discards them.

use crate::compose::Composite;
use crate::error::StageError;
use crate::io::{EnviHeader, RpcModel};
use crate::metadata::IngestionMetadata;
use crate::raster::RasterBuffer;
use crate::sensor::SensorProfile;
use crate::tiles::TilePyramid;
use crate::warp::SourceGeoref;

use super::artifacts::ArtifactStaging;
use super::types::{IngestOutput, PipelineStage};

#[derive(Debug)]
pub struct Loaded {
    pub raster: RasterBuffer,
    pub header: EnviHeader,
    pub rpc: Option<RpcModel>,
}

#[derive(Debug)]
pub struct Classified {
    pub raster: RasterBuffer,
    pub profile: SensorProfile,
    pub rpc: Option<RpcModel>,
}

#[derive(Debug)]
pub struct Reprojected {
    pub raster: RasterBuffer,
    pub source: SourceGeoref,
    pub profile: SensorProfile,
    pub rpc: Option<RpcModel>,
}

#[derive(Debug)]
pub struct Corrected {
    pub raster: RasterBuffer,
    pub profile: SensorProfile,
    pub metadata: IngestionMetadata,
}

#[derive(Debug)]
pub struct Composited {
    pub composite: Composite,
    pub metadata: IngestionMetadata,
    pub staging: ArtifactStaging,
}

#[derive(Debug)]
pub struct Tiled {
    pub metadata: IngestionMetadata,
    pub pyramid: TilePyramid,
    pub staging: ArtifactStaging,
}

/// Where an ingestion currently stands.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum IngestState {
    /// Nothing has been read yet.
    Pending,
    Loaded(Loaded),
    Classified(Classified),
    Reprojected(Reprojected),
    Corrected(Corrected),
    Composited(Composited),
    Tiled(Tiled),
    Completed(IngestOutput),
    Failed(StageError),
}

/// Payload-free name of an [`IngestState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateName {
    Pending,
    Loaded,
    Classified,
    Reprojected,
    Corrected,
    Composited,
    Tiled,
    Completed,
    Failed,
}

impl IngestState {
    pub fn name(&self) -> StateName {
        match self {
            Self::Pending => StateName::Pending,
            Self::Loaded(_) => StateName::Loaded,
            Self::Classified(_) => StateName::Classified,
            Self::Reprojected(_) => StateName::Reprojected,
            Self::Corrected(_) => StateName::Corrected,
            Self::Composited(_) => StateName::Composited,
            Self::Tiled(_) => StateName::Tiled,
            Self::Completed(_) => StateName::Completed,
            Self::Failed(_) => StateName::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Stage that leaves this state, if any.
    pub fn next_stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Pending => Some(PipelineStage::Loading),
            Self::Loaded(_) => Some(PipelineStage::Classifying),
            Self::Classified(_) => Some(PipelineStage::Reprojecting),
            Self::Reprojected(_) => Some(PipelineStage::Correcting),
            Self::Corrected(_) => Some(PipelineStage::Compositing),
            Self::Composited(_) => Some(PipelineStage::Tiling),
            Self::Tiled(_) => Some(PipelineStage::Finalizing),
            Self::Completed(_) | Self::Failed(_) => None,
        }
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
