use arrow_schema::ArrowError;
use plotters::drawing::DrawingAreaErrorKind;
use std::fmt;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Aggregate,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse Error: {0}")]
    Parse(String),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Schema Error: required column '{column}' not found (available: {})", available.join(", "))]
    Schema {
        column: String,
        available: Vec<String>,
    },
    #[error("Insufficient Data: {0}")]
    InsufficientData(String),
    #[error("Config Error: {0}")]
    Config(String),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Chart Error: {0}")]
    Chart(String),
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Attributes the error to a pipeline stage. An error that already
    /// carries a stage keeps it.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            err @ PipelineError::Stage { .. } => err,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying condition, with any stage wrapper removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for PipelineError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PipelineError::Chart(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
