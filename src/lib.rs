pub mod builder;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod index;
pub mod ingest;
pub mod model;
pub mod numeric;
pub mod parsers;
pub mod resource;
pub mod wildcard;
pub mod xml;
