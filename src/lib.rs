//! # Learnova AI
//!
//! An HTTP service for AI-assisted tutoring: callers upload study material
//! files, ingest syllabus documents into a retrieval store, and request
//! AI-generated explanations and chat answers steered by education level.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │  HTTP routes │──▶│ UploadStore + │──▶│   SQLite     │
//! │   (axum)     │   │  Extractor    │   │  materials   │
//! └──────┬───────┘   └───────────────┘   └──────┬───────┘
//!        │                                      │
//!        ▼                                      ▼
//! ┌──────────────┐                      ┌──────────────┐
//! │  AiGateway   │◀─────────────────────│  embedding   │
//! │ (OpenAI/off) │   cosine retrieval   │  vectors     │
//! └──────────────┘                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! learnova init                 # create the database
//! learnova serve                # start the HTTP server (PORT overrides the bind port)
//! curl localhost:5000/api/health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request/response types |
//! | [`upload`] | Filename validation and sanitized file storage |
//! | [`extract`] | Text extraction from uploaded files |
//! | [`embedding`] | OpenAI embeddings client and vector utilities |
//! | [`syllabus`] | Persistent syllabus material store |
//! | [`gateway`] | AI gateway trait and implementations |
//! | [`server`] | HTTP server and route handlers |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod gateway;
pub mod migrate;
pub mod models;
pub mod server;
pub mod syllabus;
pub mod upload;
