pub mod ingest;
pub mod logstash;
