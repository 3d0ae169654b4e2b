//! Core library: normalization, classification, analysis and Q&A retrieval
//! over categorized project documents.

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod entities;
pub mod error;
pub mod lexicon;
pub mod metadata;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod qa;
pub mod rules;
pub mod synthesis;
