pub mod logstash;
pub mod processors;
pub mod registry;

use crate::error::{Error, Result};
use crate::prog::{ingest, logstash as ls};
use logstash::LogstashCtx;
use processors::Processor;
use registry::Registry;
use serde_json::{Map, Value};
use std::io::Write;
use tracing::debug;

/// Pipeline driver: owns the ordered processor list and drives
/// compilation into either backend.
pub struct Generator {
    pub id: Option<String>,
    description: String,
    processors: Vec<Box<dyn Processor>>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.id)
            .field("description", &self.description)
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Generator {
    pub fn new(registry: &Registry, description: &str, records: &[Value]) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::NoProcessors);
        }

        let processors = registry.load_all(records)?;
        debug!(count = processors.len(), "loaded pipeline processors");

        Ok(Generator {
            id: None,
            description: description.to_string(),
            processors,
        })
    }

    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    pub fn compile_ingest(&self) -> Result<ingest::Pipeline> {
        let mut pipeline = ingest::Pipeline {
            description: self.description.clone(),
            ..ingest::Pipeline::default()
        };

        pipeline.processors = compile_ingest_processors(&self.processors)?;

        if pipeline.on_failure.is_empty() {
            let mut params = Map::new();
            params.insert("field".to_string(), Value::String("error.message".to_string()));
            params.insert(
                "value".to_string(),
                Value::String("{{ _ingest.on_failure_message }}".to_string()),
            );
            pipeline.on_failure = ingest::single_processor("set", params);
        }

        Ok(pipeline)
    }

    pub fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<ls::Pipeline> {
        let reporter = logstash::error_reporter();
        let compiled = logstash::compile_processors(ctx, &reporter, &self.processors)?;

        Ok(ls::Pipeline {
            pipeline_id: None,
            description: self.description.clone(),
            block: compiled.block,
        })
    }

    pub fn make_ingest(&self, out: &mut dyn Write) -> Result<()> {
        let prog = self.compile_ingest()?;
        ingest::serialize(out, &prog)
    }

    pub fn make_logstash(&self, out: &mut dyn Write, ctx: &mut LogstashCtx) -> Result<()> {
        let mut prog = self.compile_logstash(ctx)?;

        if ctx.verbose {
            let mut block = ls::Block::one(ls::print_event_debug("init").into_stmt());
            block.append(prog.block);
            block.push(ls::print_event_debug("emit").into_stmt());
            prog.block = block;
        }

        prog.pipeline_id = self.id.clone();
        ls::serialize(out, &prog)
    }
}

/// Concatenate the ingest steps of a processor sequence, in order.
pub fn compile_ingest_processors(input: &[Box<dyn Processor>]) -> Result<Vec<ingest::Processor>> {
    let mut steps = Vec::new();
    for p in input {
        steps.extend(p.compile_ingest()?);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generator(records: Vec<Value>) -> Generator {
        let registry = Registry::with_defaults();
        Generator::new(&registry, "test pipeline", &records).unwrap()
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let registry = Registry::with_defaults();
        let err = Generator::new(&registry, "empty", &[]).unwrap_err();
        assert!(matches!(err, Error::NoProcessors));
    }

    #[test]
    fn ingest_pipeline_gets_default_on_failure_step() {
        let gen = generator(vec![json!({"remove": {"field": "tmp"}})]);
        let prog = gen.compile_ingest().unwrap();

        assert_eq!(prog.processors.len(), 1);
        let v = serde_json::to_value(&prog.on_failure).unwrap();
        assert_eq!(
            v,
            json!([{"set": {
                "field": "error.message",
                "value": "{{ _ingest.on_failure_message }}",
            }}])
        );
    }

    #[test]
    fn verbose_logstash_output_brackets_pipeline_with_debug_prints() {
        let gen = generator(vec![json!({"remove": {"field": "tmp"}})]);
        let mut ctx = LogstashCtx::new(true, false);

        let mut buf = Vec::new();
        gen.make_logstash(&mut buf, &mut ctx).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("puts 'init'"));
        assert!(text.contains("puts 'emit'"));
    }

    #[test]
    fn pipeline_id_is_threaded_into_the_program() {
        let mut gen = generator(vec![json!({"remove": {"field": "tmp"}})]);
        gen.id = Some("apache".to_string());
        let mut ctx = LogstashCtx::new(false, false);

        let mut buf = Vec::new();
        gen.make_logstash(&mut buf, &mut ctx).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("if [@metadata][pipeline] == \"apache\" {"));
    }
}
