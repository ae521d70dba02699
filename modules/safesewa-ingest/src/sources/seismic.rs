use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use scraper::{Html, Selector};
use tracing::debug;

use safesewa_common::{AlertCategory, CandidateAlert, GeoPoint, SourceError};

use super::{fetch_error, http_client, SourceAdapter};

/// Scrapes the national seismic bulletin table. Columns: #, date (B.S. and
/// "A.D.:" lines), time ("Local:"/"UTC:" lines; the UTC one is used),
/// latitude, longitude,
/// magnitude, epicenter. Only rows at or above the magnitude threshold
/// become candidates; dedup keys on the epicenter name (substring match, so
/// follow-up bulletins for the same quake collapse).
pub struct SeismicSource {
    http: reqwest::Client,
    url: String,
    min_magnitude: f64,
}

impl SeismicSource {
    pub fn new(url: impl Into<String>, min_magnitude: f64, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            url: url.into(),
            min_magnitude,
        }
    }
}

#[async_trait]
impl SourceAdapter for SeismicSource {
    fn name(&self) -> &'static str {
        "seismic"
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

        Ok(parse_bulletins(&body, self.min_magnitude))
    }
}

/// Parse the bulletin table. Malformed rows are skipped, never fatal.
pub fn parse_bulletins(html: &str, min_magnitude: f64) -> Vec<CandidateAlert> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse("table tbody tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");

    let mut candidates = Vec::new();
    for row in doc.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>())
            .collect();
        match parse_row(&cells) {
            Some(bulletin) => {
                if bulletin.magnitude >= min_magnitude {
                    candidates.push(bulletin.into_candidate());
                }
            }
            None => debug!("Skipping malformed bulletin row"),
        }
    }
    candidates
}

struct Bulletin {
    location: GeoPoint,
    magnitude: f64,
    epicenter: String,
    detected_at: chrono::DateTime<Utc>,
}

impl Bulletin {
    fn into_candidate(self) -> CandidateAlert {
        CandidateAlert {
            category: AlertCategory::Earthquake,
            location: self.location,
            description: format!("Mag {} at {}", self.magnitude, self.epicenter),
            detected_at: self.detected_at,
            source: "seismic".to_string(),
            dedup_key: Some(self.epicenter),
        }
    }
}

fn parse_row(cells: &[String]) -> Option<Bulletin> {
    if cells.len() < 7 {
        return None;
    }
    let date = labeled_line(&cells[1], "A.D.:")?;
    // The time cell carries both "Local:" and "UTC:" lines; only the UTC
    // one can be stamped as a UTC timestamp.
    let time = labeled_line(&cells[2], "UTC:")?;
    let lat: f64 = cells[3].trim().parse().ok()?;
    let lng: f64 = cells[4].trim().parse().ok()?;
    let magnitude: f64 = cells[5].trim().parse().ok()?;
    let epicenter = cells[6].trim().to_string();
    if epicenter.is_empty() {
        return None;
    }

    let location = GeoPoint::new(lat, lng).ok()?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&time, "%H:%M"))
        .ok()?;

    Some(Bulletin {
        location,
        magnitude,
        epicenter,
        detected_at: NaiveDateTime::new(date, time).and_utc(),
    })
}

/// Pull the value following `label` out of a multi-line cell
/// (e.g. "B.S.:2081-09-17\nA.D.:2025-01-01" → "2025-01-01").
fn labeled_line(cell: &str, label: &str) -> Option<String> {
    cell.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix(label)
            .map(|rest| rest.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}
