//! URL construction for API endpoints.
//!
//! All outbound URLs are built here from a base endpoint, path segments and
//! a query map, so feature modules never concatenate URL strings.

use reqwest::Url;

use super::client::ApiError;

/// Builder for API request URLs.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: Url,
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl UrlBuilder {
    /// Start from a base endpoint such as [`super::TEXT_API`].
    pub fn new(base: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL: {e}")))?;
        Ok(Self {
            base,
            segments: Vec::new(),
            query: Vec::new(),
        })
    }

    /// Append a path segment. Percent-encoding is applied on build.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only if the value is present.
    pub fn query_opt<T: ToString>(self, key: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Append `key=true` only when the flag is set.
    pub fn flag(self, key: impl Into<String>, enabled: bool) -> Self {
        if enabled {
            self.query(key, "true")
        } else {
            self
        }
    }

    pub fn build(self) -> Result<Url, ApiError> {
        let mut url = self.base;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidRequest("base URL cannot have segments".to_string()))?;
            for segment in &self.segments {
                path.push(segment);
            }
        }
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
