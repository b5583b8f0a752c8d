use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, format::quote, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Split {
    field: String,
    separator: String,
    regex: String,
    to: String,
    drop_field: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default)]
    separator: String,
    #[serde(default)]
    regex: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    drop_field: bool,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.separator.is_empty() && self.regex.is_empty() {
            return Err(Error::Config(
                "split requires separator or regex setting".to_string(),
            ));
        }
        if !self.separator.is_empty() && !self.regex.is_empty() {
            return Err(Error::Config("separator and regex set".to_string()));
        }
        Ok(())
    }
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("split", raw)?;
    config.validate()?;

    Ok(Box::new(Split {
        field: config.field,
        separator: config.separator,
        regex: config.regex,
        to: config.to,
        drop_field: config.drop_field,
    }))
}

impl Split {
    fn target(&self) -> &str {
        if self.to.is_empty() {
            &self.field
        } else {
            &self.to
        }
    }

    fn ingest_regex(&self) -> ingest::Processor {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("separator".to_string(), json!(self.regex));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        ingest::Processor::new("split", params)
    }

    /// The ingest split processor only accepts regular expressions, so a
    /// literal separator lowers to a painless one-liner instead.
    fn ingest_separator(&self) -> ingest::Processor {
        let code = format!(
            "ctx.{} = ctx.{}.split(Pattern.quote(\"{}\"));",
            self.target(),
            self.field,
            self.separator
        );

        let mut params = Map::new();
        params.insert("lang".to_string(), json!("painless"));
        params.insert("source".to_string(), json!(code));
        ingest::Processor::new("script", params)
    }

    fn logstash_regex(&self) -> Filter {
        let source = quote(&ls::normalize_field(&self.field));
        let target = quote(&ls::normalize_field(self.target()));

        let code = format!(
            "event.set({}, event.get({}).split(/{}/))",
            target, source, self.regex
        );
        let mut params = Params::new();
        params.insert("code", code);
        Filter::new("ruby", params)
    }

    fn logstash_separator(&self) -> Filter {
        let mut params = Params::new();
        params.insert("terminator", self.separator.clone());
        params.target(&self.to);
        Filter::new("split", params)
    }
}

impl Processor for Split {
    fn name(&self) -> &'static str {
        "split"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let split = if !self.regex.is_empty() {
            self.ingest_regex()
        } else {
            self.ingest_separator()
        };

        let mut ps = ingest::single(split);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut split = if !self.regex.is_empty() {
            self.logstash_regex()
        } else {
            self.logstash_separator()
        };

        split.params.drop_field(self.drop_field, &self.field);

        Ok(FilterBlock {
            block: ls::verbose_block(ctx.verbose, "split", Block::one(split.into_stmt())),
            failure_tags: Vec::new(),
        })
    }
}
