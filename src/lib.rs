#![doc = "punch-capture: core pipeline for attaching captured photos to punch records."]

//! This crate contains the capture → encode → upload → associate pipeline, its
//! data models and collaborator traits, and the HTTP clients for the object store
//! and the punch API. Process-level concerns (config files, env secrets, tracing
//! subscriber, host devices) belong to the CLI crate.
//!
//! # Navigation
//! - Orchestrator: [`pipeline::PunchSession`]
//! - Encoder ladder: [`ladder::EncoderLadder`]
//! - Collaborator traits: [`contract`]

pub mod acquire;
pub mod api;
pub mod associate;
pub mod config;
pub mod contract;
pub mod draft;
pub mod error;
pub mod ladder;
pub mod media;
pub mod object_name;
pub mod pipeline;
pub mod store;
