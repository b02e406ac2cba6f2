// ABOUTME: API module containing the HTTP handlers for the wordledger REST API.
// ABOUTME: Organized into sub-modules for text ingestion and word queries.

pub mod texts;
pub mod words;
