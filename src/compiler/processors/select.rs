use super::{parse_config, Processor};
use crate::compiler::logstash::{self, FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::compiler::compile_ingest_processors;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{Block, Filter, Params};
use serde::Deserialize;
use serde_json::Value;

/// Composite processor holding one child pipeline per backend, so a
/// pipeline author can target each backend with different processors.
#[derive(Debug)]
pub struct Select {
    ingest: Vec<Box<dyn Processor>>,
    logstash: Vec<Box<dyn Processor>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    ingest: Vec<Value>,
    #[serde(default)]
    logstash: Vec<Value>,
}

pub fn make(reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("select", raw)?;

    let ingest = reg.load_all(&config.ingest)?;
    let logstash = reg.load_all(&config.logstash)?;

    Ok(Box::new(Select { ingest, logstash }))
}

impl Processor for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        compile_ingest_processors(&self.ingest)
    }

    /// Child failures are folded into one synthetic tag, so an outer
    /// pipeline sees "this segment failed" without knowing which child
    /// was responsible.
    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let failure_tags = vec![ctx.create_tag("_failure_select")];

        let on_error = {
            let failure_tags = failure_tags.clone();
            move |_filter: &str, _tags: &[String]| {
                let mut params = Params::new();
                params.insert("add_tag", failure_tags.clone());
                FilterBlock {
                    block: Block::one(Filter::new("mutate", params).into_stmt()),
                    failure_tags: failure_tags.clone(),
                }
            }
        };

        logstash::compile_processors(ctx, &on_error, &self.logstash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(raw: Value) -> Box<dyn Processor> {
        make(&Registry::with_defaults(), &raw).unwrap()
    }

    #[test]
    fn children_compile_only_for_their_backend() {
        let p = select(json!({
            "ingest": [{"script": {"code": "ctx.a = 1"}}],
            "logstash": [{"ruby": {"code": "event.set('a', 1)"}}],
        }));

        // each child list holds a processor unsupported on the other
        // backend, so compilation succeeds only because the lists are
        // kept separate
        assert!(p.compile_ingest().is_ok());
        let mut ctx = LogstashCtx::new(false, false);
        assert!(p.compile_logstash(&mut ctx).is_ok());
    }

    #[test]
    fn child_failures_fold_into_one_synthetic_tag() {
        let p = select(json!({
            "logstash": [
                {"date": {"field": "ts", "formats": ["UNIX"]}},
                {"user_agent": {"field": "agent"}},
            ],
        }));

        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        assert_eq!(blk.failure_tags.len(), 1);
        assert!(blk.failure_tags[0].starts_with("_failure_select_"));
    }

    #[test]
    fn invalid_child_fails_load() {
        let err = make(
            &Registry::with_defaults(),
            &json!({"ingest": [{"nosuch": {}}]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn empty_select_compiles_to_nothing() {
        let p = select(json!({}));
        assert!(p.compile_ingest().unwrap().is_empty());

        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();
        assert!(blk.block.is_empty());
        assert!(blk.failure_tags.is_empty());
    }
}
