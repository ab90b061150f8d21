//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the service.
//!
//! # Tasks
//! - Ingestion: workers decoding queued order documents into the cache

mod consumer;

pub use consumer::{
    ingest_channel, process_message, spawn_consumers, ChannelSource, MessageSource,
    OrderPublisher,
};
