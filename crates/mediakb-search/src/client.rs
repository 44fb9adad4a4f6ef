use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument};

use mediakb_core::config::ElasticsearchConfig;
use mediakb_core::error::{Error, Result};

/// Thin JSON client for the handful of Elasticsearch endpoints we use.
///
/// Requests are sent once; a timeout or refused connection surfaces as
/// [`Error::Transport`] and a non-success status as [`Error::Backend`].
#[derive(Debug, Clone)]
pub struct EsClient {
	base_url: Url,
	http: Client,
	username: Option<String>,
	password: Option<String>,
}

impl EsClient {
	pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
		let base_url = Url::parse(&config.url)
			.map_err(|e| Error::InvalidConfig(format!("elasticsearch.url '{}': {}", config.url, e)))?;
		let http = Client::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| Error::InvalidConfig(format!("http client: {}", e)))?;
		Ok(Self { base_url, http, username: config.username.clone(), password: config.password.clone() })
	}

	pub fn base_url(&self) -> &str { self.base_url.as_str() }

	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| Error::InvalidConfig(format!("'{}' cannot be a base url", self.base_url)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let rb = self.http.request(method, url);
		match &self.username {
			Some(user) => rb.basic_auth(user, self.password.as_deref()),
			None => rb,
		}
	}

	async fn send(&self, rb: RequestBuilder) -> Result<Response> {
		rb.send().await.map_err(map_http_error)
	}

	/// `POST /<index>/_search`, returning the raw response body.
	#[instrument(skip(self, body))]
	pub async fn search(&self, index: &str, body: &Value) -> Result<Value> {
		debug!(%body, "search");
		let url = self.endpoint(&[index, "_search"])?;
		let resp = self.send(self.request(Method::POST, url).json(body)).await?;
		json_body(ensure_success(resp).await?).await
	}

	/// `GET /<index>/_doc/<id>`. A 404 or `found: false` is `None`.
	#[instrument(skip(self))]
	pub async fn get_doc(&self, index: &str, id: &str) -> Result<Option<Value>> {
		let url = self.endpoint(&[index, "_doc", id])?;
		let resp = self.send(self.request(Method::GET, url)).await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let doc = json_body(ensure_success(resp).await?).await?;
		if doc.get("found").and_then(Value::as_bool) == Some(false) {
			return Ok(None);
		}
		Ok(Some(doc))
	}

	pub async fn index_exists(&self, index: &str) -> Result<bool> {
		let url = self.endpoint(&[index])?;
		let resp = self.send(self.request(Method::HEAD, url)).await?;
		match resp.status() {
			s if s.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			_ => Err(backend_error(resp).await),
		}
	}

	pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
		let url = self.endpoint(&[index])?;
		let resp = self.send(self.request(Method::PUT, url).json(body)).await?;
		ensure_success(resp).await?;
		Ok(())
	}

	/// Returns `false` when there was nothing to delete.
	pub async fn delete_index(&self, index: &str) -> Result<bool> {
		let url = self.endpoint(&[index])?;
		let resp = self.send(self.request(Method::DELETE, url)).await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Ok(false);
		}
		ensure_success(resp).await?;
		Ok(true)
	}

	/// `POST /<index>/_bulk` with an NDJSON body.
	pub async fn bulk(&self, index: &str, ndjson: String) -> Result<Value> {
		let url = self.endpoint(&[index, "_bulk"])?;
		let rb = self
			.request(Method::POST, url)
			.header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
			.body(ndjson);
		let resp = self.send(rb).await?;
		json_body(ensure_success(resp).await?).await
	}
}

fn map_http_error(error: reqwest::Error) -> Error {
	if error.is_timeout() {
		Error::Transport(format!("request timeout: {}", error))
	} else if error.is_connect() {
		Error::Transport(format!("connection error: {}", error))
	} else {
		Error::Transport(format!("http error: {}", error))
	}
}

async fn backend_error(resp: Response) -> Error {
	let status = resp.status().as_u16();
	let body = resp.text().await.unwrap_or_default();
	Error::Backend { status, body }
}

async fn ensure_success(resp: Response) -> Result<Response> {
	if resp.status().is_success() { Ok(resp) } else { Err(backend_error(resp).await) }
}

async fn json_body(resp: Response) -> Result<Value> {
	let status = resp.status().as_u16();
	resp.json::<Value>()
		.await
		.map_err(|e| Error::Backend { status, body: format!("invalid JSON response: {}", e) })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client(url: &str) -> EsClient {
		EsClient::new(&ElasticsearchConfig { url: url.to_string(), ..Default::default() }).unwrap()
	}

	#[test]
	fn endpoint_joins_segments_and_escapes_ids() {
		let c = client("http://localhost:9200/");
		assert_eq!(c.endpoint(&["movie", "_doc", "tt0113277"]).unwrap().as_str(), "http://localhost:9200/movie/_doc/tt0113277");
		assert_eq!(c.endpoint(&["book", "_doc", "a/b"]).unwrap().as_str(), "http://localhost:9200/book/_doc/a%2Fb");
	}

	#[test]
	fn endpoint_keeps_a_path_prefix() {
		let c = client("https://es.example.org/search");
		assert_eq!(c.endpoint(&["book", "_search"]).unwrap().as_str(), "https://es.example.org/search/book/_search");
	}

	#[test]
	fn bad_url_is_a_config_error() {
		let err = EsClient::new(&ElasticsearchConfig { url: "not a url".into(), ..Default::default() }).unwrap_err();
		assert!(matches!(err, Error::InvalidConfig(_)));
	}
}
