use crate::error::RetrievalError;
use crate::models::Embedding;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text to fixed-length vectors, one per input, in input order.
///
/// Implementations must be deterministic for a given model and must never hand back a
/// vector whose length differs from [`Embedder::dimensions`]. Prefer one
/// [`Embedder::embed_batch`] call over many single calls: inference cost is dominated by
/// round trips.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, RetrievalError>;

    async fn embed_one(&self, text: &str) -> Result<Embedding, RetrievalError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(RetrievalError::EmbeddingFailure(
                "expected exactly one vector for a single input".to_string(),
            )),
        }
    }
}

fn ensure_non_empty(texts: &[String]) -> Result<(), RetrievalError> {
    if texts.is_empty() {
        return Err(RetrievalError::EmbeddingFailure(
            "no input texts to embed".to_string(),
        ));
    }
    Ok(())
}

/// Hashed character-trigram embedder. Needs no model, so it is the offline default.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        let buckets = vector.len() as u64;
        if chars.len() < 3 {
            vector[(fnv1a(&lowered) % buckets) as usize] += 1.0;
        } else {
            for window in chars.windows(3) {
                let token = window.iter().collect::<String>();
                vector[(fnv1a(&token) % buckets) as usize] += 1.0;
            }
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash = 1469598103934665603u64;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, RetrievalError> {
        ensure_non_empty(texts)?;
        texts
            .iter()
            .map(|text| Embedding::new(self.embed_text(text)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedder backed by an Ollama-compatible `/api/embed` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    endpoint: Url,
    model: String,
    dimensions: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, RetrievalError> {
        if config.dimensions == 0 {
            return Err(RetrievalError::InvalidArgument(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| base.join("/api/embed"))
            .map_err(|error| {
                RetrievalError::InvalidArgument(format!(
                    "invalid embedding url {}: {error}",
                    config.base_url
                ))
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| RetrievalError::EmbeddingFailure(error.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.model,
            dimensions: config.dimensions,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn normalize(
        &self,
        inputs: usize,
        raw: Vec<Vec<f32>>,
    ) -> Result<Vec<Embedding>, RetrievalError> {
        if raw.len() != inputs {
            return Err(RetrievalError::EmbeddingFailure(format!(
                "model returned {} vectors for {} inputs",
                raw.len(),
                inputs
            )));
        }

        raw.into_iter()
            .enumerate()
            .map(|(position, values)| {
                if values.len() != self.dimensions {
                    return Err(RetrievalError::EmbeddingFailure(format!(
                        "vector {position} has dimension {} instead of {}",
                        values.len(),
                        self.dimensions
                    )));
                }
                Embedding::new(values)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, RetrievalError> {
        ensure_non_empty(texts)?;
        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            inputs = texts.len(),
            "embedding batch"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|error| RetrievalError::EmbeddingFailure(error.to_string()))?;

        if !response.status().is_success() {
            return Err(RetrievalError::EmbeddingFailure(format!(
                "embedding request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|error| RetrievalError::EmbeddingFailure(error.to_string()))?;

        self.normalize(texts.len(), payload.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::{CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig};
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed_text("Hydraulic pressure and flow");
        let second = embedder.embed_text("Hydraulic pressure and flow");
        assert_eq!(first, second);
    }

    #[test]
    fn short_text_still_produces_a_signal() {
        let embedder = CharacterNgramEmbedder { dimensions: 16 };
        let vector = embedder.embed_text("ab");
        let norm = vector.iter().map(|value| value * value).sum::<f32>();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vectors = embedder
            .embed_batch(&texts(&["alpha beta", "gamma delta"]))
            .await
            .expect("embedding should succeed");

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|vector| vector.dimensions() == 32));
        assert_eq!(vectors[1].as_slice(), embedder.embed_text("gamma delta").as_slice());
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let embedder = CharacterNgramEmbedder::default();
        let error = embedder.embed_batch(&[]).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmbeddingFailure);
    }

    fn http_embedder(base_url: String, dimensions: usize) -> HttpEmbedder {
        HttpEmbedder::new(HttpEmbedderConfig {
            base_url,
            dimensions,
            ..Default::default()
        })
        .expect("config should be valid")
    }

    #[tokio::test]
    async fn http_embedder_posts_batch_and_reads_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_json(json!({
                "model": "all-minilm",
                "input": ["first", "second"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = http_embedder(server.uri(), 3);
        let vectors = embedder
            .embed_batch(&texts(&["first", "second"]))
            .await
            .expect("embedding should succeed");

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1].as_slice(), &[0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn http_embedder_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0]],
            })))
            .mount(&server)
            .await;

        let embedder = http_embedder(server.uri(), 3);
        let error = embedder.embed_one("query").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmbeddingFailure);
        assert!(error.to_string().contains("dimension 2 instead of 3"));
    }

    #[tokio::test]
    async fn http_embedder_rejects_missing_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0, 0.0]],
            })))
            .mount(&server)
            .await;

        let embedder = http_embedder(server.uri(), 3);
        let error = embedder
            .embed_batch(&texts(&["one", "two"]))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("1 vectors for 2 inputs"));
    }

    #[tokio::test]
    async fn http_embedder_surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let embedder = http_embedder(server.uri(), 3);
        let error = embedder.embed_one("query").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmbeddingFailure);
        assert!(error.to_string().contains("500"));
    }

    #[test]
    fn http_embedder_rejects_bad_configuration() {
        let bad_url = HttpEmbedder::new(HttpEmbedderConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(bad_url.kind(), ErrorKind::InvalidArgument);

        let zero_dims = HttpEmbedder::new(HttpEmbedderConfig {
            dimensions: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(zero_dims.kind(), ErrorKind::InvalidArgument);
    }
}
