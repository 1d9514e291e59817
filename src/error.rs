use std::fmt;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Segmentation,
    MaskSelection,
    Conditioning,
    Generation,
    Compositing,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Segmentation => "segmentation",
            Stage::MaskSelection => "mask selection",
            Stage::Conditioning => "conditioning",
            Stage::Generation => "generation",
            Stage::Compositing => "compositing",
            Stage::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("no region found: segmentation returned zero proposals")]
    NoRegionFound,

    #[error(
        "dimension mismatch during {stage}: expected {}x{}, got {}x{}",
        .expected.0, .expected.1, .actual.0, .actual.1
    )]
    DimensionMismatch {
        stage: Stage,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("{stage} collaborator failed: {source:#}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("video encoding failed: {0:#}")]
    Encoding(#[source] anyhow::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn mismatch(stage: Stage, expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            stage,
            expected,
            actual,
        }
    }

    pub fn collaborator(stage: Stage, source: anyhow::Error) -> Self {
        Self::Collaborator { stage, source }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stage that failed, when the error is tied to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::NoRegionFound => Some(Stage::MaskSelection),
            Self::DimensionMismatch { stage, .. } | Self::Collaborator { stage, .. } => {
                Some(*stage)
            }
            Self::Encoding(_) => Some(Stage::Encoding),
            Self::InvalidConfig(_) => None,
        }
    }
}
