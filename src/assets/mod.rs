//! Upload ingestion: arbitrary raster input in, lossless PNG out.

pub mod ingest;
