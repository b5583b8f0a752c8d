use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Declarative pipeline description as loaded from disk: a free-form
/// description plus the ordered list of raw processor records. Records
/// stay untyped here; the registry gives them meaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub processors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FileLayout {
    #[serde(default)]
    pipeline: PipelineSpec,
}

/// Load and merge one or more pipeline files (YAML or JSON, decided by
/// extension). Later files override earlier ones key by key.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<PipelineSpec> {
    let mut builder = config::Config::builder();
    for path in paths {
        builder = builder.add_source(config::File::from(path.as_ref()));
    }

    let layout: FileLayout = builder.build()?.try_deserialize()?;
    debug!(
        processors = layout.pipeline.processors.len(),
        files = paths.len(),
        "loaded pipeline spec"
    );

    Ok(layout.pipeline)
}
