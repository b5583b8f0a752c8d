use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Sample event for dry runs: a flat key/value record.
pub type Event = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// One event per non-empty line, stored under a `message` key.
    Plain,
    /// Stream of concatenated JSON objects.
    Json,
}

impl FromStr for EventFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(EventFormat::Plain),
            "json" => Ok(EventFormat::Json),
            other => Err(Error::UnsupportedEventFormat(other.to_string())),
        }
    }
}

/// Stream events from `input`, handing each one to `out` as it is read.
pub fn stream_events(
    format: EventFormat,
    input: impl BufRead,
    out: &mut dyn FnMut(Event) -> Result<()>,
) -> Result<()> {
    match format {
        EventFormat::Plain => read_plain_events(input, out),
        EventFormat::Json => read_json_events(input, out),
    }
}

/// Collect all events from a file, or stdin when no path is given.
pub fn read_events(format: EventFormat, path: Option<&Path>) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let collect = &mut |event: Event| {
        events.push(event);
        Ok(())
    };

    match path {
        Some(path) => stream_events(format, BufReader::new(File::open(path)?), collect)?,
        None => stream_events(format, io::stdin().lock(), collect)?,
    }

    Ok(events)
}

fn read_plain_events(input: impl BufRead, out: &mut dyn FnMut(Event) -> Result<()>) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let mut event = Event::new();
        event.insert("message".to_string(), Value::String(line));
        out(event)?;
    }
    Ok(())
}

fn read_json_events(input: impl Read, out: &mut dyn FnMut(Event) -> Result<()>) -> Result<()> {
    let stream = serde_json::Deserializer::from_reader(input).into_iter::<Event>();
    for event in stream {
        out(event?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(format: EventFormat, input: &str) -> Vec<Event> {
        let mut events = Vec::new();
        stream_events(format, input.as_bytes(), &mut |event| {
            events.push(event);
            Ok(())
        })
        .unwrap();
        events
    }

    #[test]
    fn plain_lines_become_message_events() {
        let events = collect(EventFormat::Plain, "first\n\nsecond\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["message"], json!("first"));
        assert_eq!(events[1]["message"], json!("second"));
    }

    #[test]
    fn json_events_stream_without_delimiters() {
        let events = collect(EventFormat::Json, "{\"a\": 1}\n{\"b\": 2}{\"c\": 3}");
        assert_eq!(events.len(), 3);
        assert_eq!(events[2]["c"], json!(3));
    }

    #[test]
    fn malformed_json_propagates() {
        let mut out = |_: Event| Ok(());
        let err = stream_events(EventFormat::Json, "{\"a\": }".as_bytes(), &mut out);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "xml".parse::<EventFormat>().unwrap_err();
        assert_eq!(err.to_string(), "event format 'xml' not supported");
    }
}
