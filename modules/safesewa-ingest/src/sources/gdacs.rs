use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tracing::debug;

use safesewa_common::{AlertCategory, CandidateAlert, GeoPoint, SourceError};

use super::{fetch_error, http_client, SourceAdapter};

/// The GDACS public disaster RSS feed. Keeps items whose title mentions a
/// flood; coordinates come from the `geo:lat`/`geo:long` point extension,
/// falling back to (0, 0) when the item carries none.
pub struct GdacsSource {
    http: reqwest::Client,
    url: String,
}

impl GdacsSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for GdacsSource {
    fn name(&self) -> &'static str {
        "gdacs"
    }

    async fn fetch(&self) -> Result<Vec<CandidateAlert>, SourceError> {
        let body = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_error(&self.url, e))?
            .text()
            .await
            .map_err(|e| fetch_error(&self.url, e))?;

        parse_feed(&body)
    }
}

/// Parse the RSS payload. feed-rs handles the feed structure; it does not
/// surface the `geo:` namespace, so the points are pulled from the raw XML
/// in document order and zipped with the entries.
pub fn parse_feed(xml: &str) -> Result<Vec<CandidateAlert>, SourceError> {
    let feed =
        feed_rs::parser::parse(xml.as_bytes()).map_err(|e| SourceError::Parse(e.to_string()))?;
    let points = extract_geo_points(xml);

    let mut candidates = Vec::new();
    for (i, entry) in feed.entries.iter().enumerate() {
        let Some(title) = entry.title.as_ref().map(|t| t.content.trim().to_string()) else {
            debug!("Skipping feed item without a title");
            continue;
        };
        if !title.to_lowercase().contains("flood") {
            continue;
        }
        let (lat, lng) = points.get(i).copied().flatten().unwrap_or((0.0, 0.0));
        let location = GeoPoint::new(lat, lng).unwrap_or(GeoPoint { lat: 0.0, lng: 0.0 });

        candidates.push(CandidateAlert {
            category: AlertCategory::Flood,
            location,
            description: title,
            detected_at: entry.published.or(entry.updated).unwrap_or_else(Utc::now),
            source: "gdacs".to_string(),
            // Feed titles are stable per event: exact match dedup.
            dedup_key: None,
        });
    }
    Ok(candidates)
}

/// One optional point per `<item>` block, in document order. feed-rs yields
/// entries in the same order, so an item without geo tags stays `None`
/// instead of stealing the next item's point.
fn extract_geo_points(xml: &str) -> Vec<Option<(f64, f64)>> {
    let item_re = Regex::new(r"(?s)<item[\s>].*?</item>").expect("static regex");
    let lat_re = Regex::new(r"<geo:lat>\s*(-?[\d.]+)\s*</geo:lat>").expect("static regex");
    let lng_re = Regex::new(r"<geo:long>\s*(-?[\d.]+)\s*</geo:long>").expect("static regex");

    item_re
        .find_iter(xml)
        .map(|m| {
            let block = m.as_str();
            let lat = lat_re.captures(block).and_then(|c| c[1].parse::<f64>().ok())?;
            let lng = lng_re.captures(block).and_then(|c| c[1].parse::<f64>().ok())?;
            Some((lat, lng))
        })
        .collect()
}
