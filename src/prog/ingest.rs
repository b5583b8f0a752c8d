use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;

/// Ingest node pipeline document. The target runtime provides native
/// per-step failure semantics, so the document stays a flat list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Pipeline {
    pub description: String,
    pub processors: Vec<Processor>,
    pub on_failure: Vec<Processor>,
}

/// One primitive operation: a single-key mapping from the operation
/// name to its parameter object.
#[derive(Debug, Clone, Serialize)]
pub struct Processor(pub Map<String, Value>);

impl Processor {
    pub fn new(name: &str, params: Map<String, Value>) -> Self {
        let mut m = Map::new();
        m.insert(name.to_string(), Value::Object(params));
        Processor(m)
    }
}

pub fn single(p: Processor) -> Vec<Processor> {
    vec![p]
}

pub fn single_processor(name: &str, params: Map<String, Value>) -> Vec<Processor> {
    single(Processor::new(name, params))
}

pub fn remove_field(name: &str) -> Processor {
    let mut params = Map::new();
    params.insert("field".to_string(), Value::String(name.to_string()));
    Processor::new("remove", params)
}

pub fn serialize(out: &mut dyn Write, p: &Pipeline) -> Result<()> {
    let buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(buf, fmt);
    p.serialize(&mut ser)?;
    let mut buf = ser.into_inner();
    buf.push(b'\n');
    out.write_all(&buf)?;
    Ok(())
}
