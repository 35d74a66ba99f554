//! Vector search over a Qdrant collection
//!
//! Query text is embedded first, then matched against the collection with
//! cosine similarity. Scores are similarities: higher is better.
//!
//! Payload layout: the chunk text lives under `document` (or `page_content`
//! for collections written by LangChain-style loaders, whose metadata sits
//! in a nested `metadata` object). Every other payload field becomes
//! document metadata.
//!
//! Also reports collection size and status for the `doctor` and
//! `collection` commands.

#![allow(deprecated)]

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, with_payload_selector::SelectorOptions, CollectionInfo, CollectionStatus,
        SearchPoints, Value as QdrantValue, WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::backends::{Embedder, VectorSearch};
use crate::config::QdrantConfig;
use crate::errors::{RagError, Result};
use crate::types::{Metadata, SearchHit};

const CONTENT_KEYS: [&str; 2] = ["document", "page_content"];

/// Size and health of one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    pub points_count: u64,
    pub segments_count: u64,
    /// `green`, `yellow`, `red`, `grey` or `unknown`
    pub status: String,
}

impl CollectionSummary {
    pub fn is_empty(&self) -> bool {
        self.points_count == 0
    }
}

/// Qdrant-backed vector search collaborator
pub struct QdrantSearch {
    client: QdrantClient,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl QdrantSearch {
    /// Connect to Qdrant. The connection is lazy; an unreachable server
    /// surfaces on the first search.
    pub fn new(config: &QdrantConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = QdrantClient::from_url(&config.url)
            .build()
            .map_err(|e| RagError::Config(format!("failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check that the Qdrant server answers
    pub async fn health_check(&self) -> Result<String> {
        let reply = self
            .client
            .health_check()
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("Qdrant unreachable: {}", e)))?;
        Ok(reply.version)
    }

    /// Point count and status of collection `name`
    pub async fn collection_info(&self, name: &str) -> Result<CollectionSummary> {
        let reply = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("Qdrant collection info failed: {}", e)))?;

        summarize(name, reply.result)
    }
}

#[async_trait]
impl VectorSearch for QdrantSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;

        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("Qdrant search failed: {}", e)))?;

        debug!(collection = %self.collection, hits = response.result.len(), "qdrant search");

        Ok(response
            .result
            .into_iter()
            .map(|point| payload_to_hit(point.payload, point.score))
            .collect())
    }
}

fn payload_to_hit(payload: HashMap<String, QdrantValue>, score: f32) -> SearchHit {
    let mut content = String::new();
    let mut metadata = Metadata::new();

    for (key, value) in payload {
        if CONTENT_KEYS.contains(&key.as_str()) {
            if let Some(JsonValue::String(text)) = qdrant_to_json_value(&value) {
                content = text;
            }
            continue;
        }

        match qdrant_to_json_value(&value) {
            // Nested LangChain metadata is flattened into the top level
            Some(JsonValue::Object(nested)) if key == "metadata" => metadata.extend(nested),
            Some(json) => {
                metadata.insert(key, json);
            }
            None => {}
        }
    }

    SearchHit {
        content,
        metadata,
        score,
    }
}

fn summarize(name: &str, info: Option<CollectionInfo>) -> Result<CollectionSummary> {
    let info = info.ok_or_else(|| RagError::NotFound(format!("collection {}", name)))?;

    let status = match CollectionStatus::try_from(info.status) {
        Ok(CollectionStatus::Green) => "green",
        Ok(CollectionStatus::Yellow) => "yellow",
        Ok(CollectionStatus::Red) => "red",
        Ok(CollectionStatus::Grey) => "grey",
        _ => "unknown",
    };

    Ok(CollectionSummary {
        name: name.to_string(),
        points_count: info.points_count.unwrap_or(0),
        segments_count: info.segments_count,
        status: status.to_string(),
    })
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::NullValue(_) => Some(JsonValue::Null),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        Kind::StructValue(object) => Some(JsonValue::Object(
            object
                .fields
                .iter()
                .filter_map(|(k, v)| qdrant_to_json_value(v).map(|json| (k.clone(), json)))
                .collect(),
        )),
    })
}
