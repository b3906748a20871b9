use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{endpoint, error_code};
use crate::models::survey::{ResponseMetadata, VectorRecord};
use crate::services::vector_index::{IndexError, IndexMatch, QueryRequest, VectorIndex};

/// Vector bucket index reached over its JSON API
pub struct HttpVectorIndex {
  client: Client,
  base_url: String,
  bucket: String,
  index: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeysRequest<'a> {
  vector_bucket_name: &'a str,
  index_name: &'a str,
  keys: &'a [String],
}

#[derive(Serialize)]
struct VectorData<'a> {
  float32: &'a [f32],
}

#[derive(Serialize)]
struct PutVector<'a> {
  key: &'a str,
  data: VectorData<'a>,
  metadata: &'a ResponseMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutRequest<'a> {
  vector_bucket_name: &'a str,
  index_name: &'a str,
  vectors: Vec<PutVector<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
  vector_bucket_name: &'a str,
  index_name: &'a str,
  top_k: usize,
  query_vector: VectorData<'a>,
  #[serde(skip_serializing_if = "Option::is_none")]
  filter: Option<Value>,
  return_metadata: bool,
  return_distance: bool,
}

#[derive(Deserialize)]
struct StoredVector {
  key: String,
  #[serde(default)]
  distance: Option<f64>,
  #[serde(default)]
  metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct VectorsResponse {
  #[serde(default)]
  vectors: Vec<StoredVector>,
}

impl HttpVectorIndex {
  pub fn new(
    client: Client,
    base_url: impl Into<String>,
    bucket: impl Into<String>,
    index: impl Into<String>,
  ) -> Self {
    Self { client, base_url: base_url.into(), bucket: bucket.into(), index: index.into() }
  }

  fn keys_request<'a>(&'a self, keys: &'a [String]) -> KeysRequest<'a> {
    KeysRequest { vector_bucket_name: &self.bucket, index_name: &self.index, keys }
  }

  async fn send<B: Serialize + Sync>(&self, operation: &str, body: &B) -> Result<Response, IndexError> {
    let url = endpoint(&self.base_url, operation);
    tracing::debug!(%url, index = %self.index, "vector index call");

    let response = self
      .client
      .post(&url)
      .json(body)
      .send()
      .await
      .map_err(|e| IndexError::transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
  }

  async fn vectors(response: Response) -> Result<Vec<StoredVector>, IndexError> {
    let parsed: VectorsResponse =
      response.json().await.map_err(|e| IndexError::invalid_response(e.to_string()))?;
    Ok(parsed.vectors)
  }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
  async fn get_vectors(&self, keys: &[String]) -> Result<Vec<String>, IndexError> {
    let response = self.send("GetVectors", &self.keys_request(keys)).await?;
    Ok(Self::vectors(response).await?.into_iter().map(|v| v.key).collect())
  }

  async fn put_vectors(&self, records: &[VectorRecord]) -> Result<(), IndexError> {
    let body = put_request(&self.bucket, &self.index, records);
    self.send("PutVectors", &body).await?;
    Ok(())
  }

  async fn delete_vectors(&self, keys: &[String]) -> Result<(), IndexError> {
    self.send("DeleteVectors", &self.keys_request(keys)).await?;
    Ok(())
  }

  async fn query_vectors(&self, request: &QueryRequest) -> Result<Vec<IndexMatch>, IndexError> {
    let body = QueryBody {
      vector_bucket_name: &self.bucket,
      index_name: &self.index,
      top_k: request.top_k,
      query_vector: VectorData { float32: &request.vector },
      filter: request.filter.as_ref().map(|f| f.to_json()),
      return_metadata: true,
      return_distance: true,
    };
    let response = self.send("QueryVectors", &body).await?;

    Ok(
      Self::vectors(response)
        .await?
        .into_iter()
        .map(|v| IndexMatch { key: v.key, distance: v.distance, metadata: v.metadata })
        .collect(),
    )
  }
}

fn put_request<'a>(bucket: &'a str, index: &'a str, records: &'a [VectorRecord]) -> PutRequest<'a> {
  PutRequest {
    vector_bucket_name: bucket,
    index_name: index,
    vectors: records
      .iter()
      .map(|r| PutVector {
        key: &r.key,
        data: VectorData { float32: &r.embedding },
        metadata: &r.metadata,
      })
      .collect(),
  }
}

pub fn classify_failure(status: u16, body: &str) -> IndexError {
  let code = error_code(body);
  if status == 404 || code.contains("NotFound") {
    IndexError::not_found(code)
  } else {
    IndexError::service(format!("HTTP {status}: {code}"))
  }
}
