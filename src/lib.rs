pub mod adapters;
pub mod aggregate;
pub mod builder;
pub mod chart;
pub mod cli;
pub mod delta;
pub mod error;
pub mod facts;
pub mod ingest;
pub mod level;
pub mod model;
pub mod node;
pub mod ratio;
pub mod report;
pub mod result;
pub mod route;
pub mod split;
pub mod table;
