use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use crate::error::AnalysisError;

/// Price as sent by the backend: either a bare number or preformatted text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Price::Amount(amount) => write!(f, "${amount:.2}"),
            Price::Text(text) => f.write_str(text),
        }
    }
}

/// One product card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recommendation {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Parsed response for one submission. Consumed once by the result sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub frame_id: Uuid,
    pub sequence: u64,
    pub metrics: BTreeMap<String, f64>,
    pub recommendations: Vec<Recommendation>,
    pub audio_url: Option<String>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
}

// Bookkeeping fields the proxy echoes next to the report.
const DIAGNOSTIC_KEYS: &[&str] = &[
    "sequence",
    "status",
    "upstream_status",
    "elapsed_ms",
    "latency_ms",
    "timestamp",
];

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    skin_report: Option<Value>,
    #[serde(default)]
    recommendations: Option<Vec<Recommendation>>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    trace_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    frame_id: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl AnalysisResult {
    pub fn empty(frame_id: Uuid, sequence: u64) -> Self {
        Self {
            frame_id,
            sequence,
            metrics: BTreeMap::new(),
            recommendations: Vec::new(),
            audio_url: None,
            error: None,
            trace_id: None,
        }
    }

    /// Parses a 2xx response body. A soft failure reported inside the body
    /// (`error`, `ok: false`, `success: false`) is kept in [`Self::error`].
    pub fn parse(body: &str, frame_id: Uuid, sequence: u64) -> Result<Self, AnalysisError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        if !value.is_object() {
            return Err(AnalysisError::MalformedResponse(
                "response body is not a JSON object".to_string(),
            ));
        }
        let wire: WireResponse = serde_json::from_value(value)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        // Top-level numbers only count when there is no `skin_report`.
        let mut metrics = BTreeMap::new();
        match &wire.skin_report {
            Some(Value::Object(report)) => collect_metrics(report, "", &mut metrics),
            _ => {
                let rest: Map<String, Value> = wire
                    .rest
                    .iter()
                    .filter(|(key, _)| !DIAGNOSTIC_KEYS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                collect_metrics(&rest, "", &mut metrics);
            }
        }

        let failed = wire.ok == Some(false) || wire.success == Some(false);
        let error = match wire.error {
            Some(error) if !error.is_empty() => Some(error),
            _ if failed => Some("Analysis failed".to_string()),
            _ => None,
        };

        Ok(Self {
            frame_id,
            sequence,
            metrics,
            recommendations: wire.recommendations.unwrap_or_default(),
            audio_url: wire.audio_url.filter(|url| !url.is_empty()),
            error,
            trace_id: wire.trace_id,
        })
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Rewrites a relative `audio_url` into an absolute one under `origin`.
    pub fn resolve_audio_url(&mut self, origin: &Url) -> Result<(), AnalysisError> {
        if let Some(raw) = self.audio_url.take() {
            let resolved = origin
                .join(&raw)
                .map_err(|e| AnalysisError::MalformedResponse(format!("audio_url {raw}: {e}")))?;
            self.audio_url = Some(resolved.to_string());
        }
        Ok(())
    }
}

fn collect_metrics(object: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, f64>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_f64() {
                    out.insert(name, v);
                }
            }
            Value::Object(inner) => collect_metrics(inner, &name, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_flattened_from_report() {
        let body = r#"{
            "ok": true,
            "trace_id": "ab12cd34",
            "skin_report": {"acne": 0.4, "pores": {"forehead": 12, "cheek": 7}, "type": "oily"},
            "sequence": 3,
            "upstream_status": 200,
            "analysis": ""
        }"#;
        let result = AnalysisResult::parse(body, Uuid::nil(), 3).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metric("acne"), Some(0.4));
        assert_eq!(result.metric("pores.forehead"), Some(12.0));
        assert_eq!(result.metric("type"), None);
        assert_eq!(result.metric("sequence"), None);
        assert_eq!(result.metric("upstream_status"), None);
        assert_eq!(result.metrics.len(), 3);
        assert_eq!(result.trace_id.as_deref(), Some("ab12cd34"));
        assert_eq!(result.sequence, 3);
    }

    #[test]
    fn top_level_metrics_skip_diagnostic_fields() {
        let body = r#"{"hydration": 55, "oiliness": {"t_zone": 0.7}, "sequence": 8, "elapsed_ms": 1200}"#;
        let result = AnalysisResult::parse(body, Uuid::nil(), 8).unwrap();
        assert_eq!(result.metric("hydration"), Some(55.0));
        assert_eq!(result.metric("oiliness.t_zone"), Some(0.7));
        assert_eq!(result.metric("sequence"), None);
        assert_eq!(result.metric("elapsed_ms"), None);
    }

    #[test]
    fn recommendations_accept_numeric_and_text_prices() {
        let body = r#"{
            "recommendations": [
                {"name": "CeraVe Hydrating Cleanser", "price": 14.5, "link": "https://shop.example/cerave"},
                {"name": "Niacinamide 10%", "price": "AED 39", "description": "Serum"}
            ]
        }"#;
        let result = AnalysisResult::parse(body, Uuid::nil(), 0).unwrap();
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(
            result.recommendations[0].price.as_ref().unwrap().to_string(),
            "$14.50"
        );
        assert_eq!(
            result.recommendations[1].price,
            Some(Price::Text("AED 39".to_string()))
        );
    }

    #[test]
    fn soft_failure_is_kept_as_error() {
        let result =
            AnalysisResult::parse(r#"{"success": false}"#, Uuid::nil(), 0).unwrap();
        assert_eq!(result.error.as_deref(), Some("Analysis failed"));

        let result = AnalysisResult::parse(
            r#"{"ok": false, "error": "No face found"}"#,
            Uuid::nil(),
            0,
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("No face found"));
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        assert!(matches!(
            AnalysisResult::parse("not json", Uuid::nil(), 0),
            Err(AnalysisError::MalformedResponse(_))
        ));
        assert!(matches!(
            AnalysisResult::parse("[1, 2]", Uuid::nil(), 0),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn relative_audio_url_is_resolved_against_origin() {
        let mut result =
            AnalysisResult::parse(r#"{"audio_url": "/audio/tts_1.mp3"}"#, Uuid::nil(), 0)
                .unwrap();
        let origin = Url::parse("https://kiosk.example:5005/").unwrap();
        result.resolve_audio_url(&origin).unwrap();
        assert_eq!(
            result.audio_url.as_deref(),
            Some("https://kiosk.example:5005/audio/tts_1.mp3")
        );

        let mut absolute = AnalysisResult::parse(
            r#"{"audio_url": "https://cdn.example/a.mp3"}"#,
            Uuid::nil(),
            0,
        )
        .unwrap();
        absolute.resolve_audio_url(&origin).unwrap();
        assert_eq!(absolute.audio_url.as_deref(), Some("https://cdn.example/a.mp3"));
    }
}
