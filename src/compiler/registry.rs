use crate::compiler::processors::{self, Processor};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

pub type Factory = fn(&Registry, &Value) -> Result<Box<dyn Processor>>;

/// Maps processor kind names to constructors. Populated once at startup;
/// read-only afterwards, so compilations may share it freely.
pub struct Registry {
    factories: HashMap<&'static str, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            factories: HashMap::new(),
        }
    }

    /// Registry holding the full compiled-in processor set.
    pub fn with_defaults() -> Self {
        let mut reg = Registry::new();
        processors::register_all(&mut reg);
        reg
    }

    /// Registering the same kind twice is a programming error in the
    /// compiled-in processor set, not a runtime condition.
    pub fn register(&mut self, name: &'static str, factory: Factory) {
        if self.factories.insert(name, factory).is_some() {
            panic!("processor '{}' already registered", name);
        }
    }

    pub fn find(&self, name: &str) -> Option<Factory> {
        self.factories.get(name).copied()
    }

    /// Load one raw record. Each record is expected to be a single-key
    /// mapping from processor kind to its options.
    pub fn load(&self, record: &Value) -> Result<Box<dyn Processor>> {
        let map = record
            .as_object()
            .ok_or_else(|| Error::Config(format!("processor record is not a mapping: {}", record)))?;

        match map.len() {
            0 => Err(Error::EmptyProcessor),
            1 => {
                let (name, params) = map.iter().next().expect("len checked");
                self.load_named(name, params)
            }
            _ => Err(Error::MultipleProcessors),
        }
    }

    pub fn load_named(&self, name: &str, config: &Value) -> Result<Box<dyn Processor>> {
        let factory = self
            .find(name)
            .ok_or_else(|| Error::UnknownProcessor(name.to_string()))?;
        factory(self, config)
    }

    /// Load all records in input order, failing fast on the first bad one.
    pub fn load_all(&self, records: &[Value]) -> Result<Vec<Box<dyn Processor>>> {
        records.iter().map(|record| self.load(record)).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_all_preserves_order() {
        let reg = Registry::with_defaults();
        let records = vec![
            json!({"remove": {"field": "a"}}),
            json!({"rename": {"field": "b", "to": "c"}}),
            json!({"geoip": {"field": "ip"}}),
        ];

        let ps = reg.load_all(&records).unwrap();
        let names: Vec<_> = ps.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["remove", "rename", "geoip"]);
    }

    #[test]
    fn unknown_kind_fails() {
        let reg = Registry::with_defaults();
        let err = reg.load(&json!({"frobnicate": {}})).unwrap_err();
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn empty_record_fails() {
        let reg = Registry::with_defaults();
        let err = reg.load(&json!({})).unwrap_err();
        assert!(matches!(err, Error::EmptyProcessor));
    }

    #[test]
    fn multi_key_record_fails() {
        let reg = Registry::with_defaults();
        let err = reg
            .load(&json!({"remove": {"field": "a"}, "geoip": {"field": "ip"}}))
            .unwrap_err();
        assert!(matches!(err, Error::MultipleProcessors));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut reg = Registry::with_defaults();
        reg.register("remove", |_, _| unreachable!());
    }

    #[test]
    fn missing_required_field_fails() {
        let reg = Registry::with_defaults();
        assert!(reg.load(&json!({"remove": {}})).is_err());
    }
}
