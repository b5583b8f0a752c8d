use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Kv {
    field: String,
    to: String,
    field_split: SplitSpec,
    value_split: SplitSpec,
    ignore_missing: bool,
    ignore_failure: bool,
}

/// How to split key/value pairs: either a character class or a full
/// regular expression. Exactly one mode per split.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
enum SplitSpec {
    Class(String),
    Regex(String),
}

impl SplitSpec {
    fn ingest_pattern(&self) -> String {
        match self {
            SplitSpec::Class(chars) => format!("[{}]+", chars),
            SplitSpec::Regex(pattern) => pattern.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    to: String,
    split: SplitSection,
    #[serde(default)]
    ignore_missing: bool,
    #[serde(default)]
    ignore_failure: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SplitSection {
    field: SplitSpec,
    value: SplitSpec,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("kv", raw)?;
    Ok(Box::new(Kv {
        field: config.field,
        to: config.to,
        field_split: config.split.field,
        value_split: config.split.value,
        ignore_missing: config.ignore_missing,
        ignore_failure: config.ignore_failure,
    }))
}

impl Processor for Kv {
    fn name(&self) -> &'static str {
        "kv"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert(
            "field_split".to_string(),
            json!(self.field_split.ingest_pattern()),
        );
        params.insert(
            "value_split".to_string(),
            json!(self.value_split.ingest_pattern()),
        );
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        if self.ignore_missing {
            params.insert("ignore_missing".to_string(), json!(true));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        Ok(ingest::single_processor("kv", params))
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.insert("source", ls::normalize_field(&self.field));
        params.target(&self.to);

        match &self.field_split {
            SplitSpec::Class(chars) => params.insert("field_split", chars.clone()),
            SplitSpec::Regex(pattern) => params.insert("field_split_pattern", pattern.clone()),
        }
        match &self.value_split {
            SplitSpec::Class(chars) => params.insert("value_split", chars.clone()),
            SplitSpec::Regex(pattern) => params.insert("value_split_pattern", pattern.clone()),
        }

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "kv",
                Block::one(Filter::new("kv", params).into_stmt()),
            ),
            failure_tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    fn config() -> Value {
        json!({
            "field": "message",
            "to": "attrs",
            "split": {"field": {"class": " ,"}, "value": {"regex": "=+"}},
        })
    }

    #[test]
    fn class_split_expands_to_character_class_pattern() {
        let p = make(&Registry::new(), &config()).unwrap();
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(v["kv"]["field_split"], json!("[ ,]+"));
        assert_eq!(v["kv"]["value_split"], json!("=+"));
        assert_eq!(v["kv"]["target_field"], json!("attrs"));
    }

    #[test]
    fn split_mode_must_be_single_key() {
        let err = make(
            &Registry::new(),
            &json!({
                "field": "message",
                "to": "attrs",
                "split": {
                    "field": {"class": " ", "regex": " +"},
                    "value": {"class": "="},
                },
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("kv"));
    }

    #[test]
    fn unknown_split_mode_fails() {
        let err = make(
            &Registry::new(),
            &json!({
                "field": "message",
                "to": "attrs",
                "split": {"field": {"glob": "*"}, "value": {"class": "="}},
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("kv"));
    }

    #[test]
    fn logstash_distinguishes_class_and_pattern_splits() {
        let p = make(&Registry::new(), &config()).unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.name, "kv");
        assert_eq!(f.params.0["field_split"], json!(" ,"));
        assert_eq!(f.params.0["value_split_pattern"], json!("=+"));
    }
}
