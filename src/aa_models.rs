// API models and data fetching for the AirAware route prediction service
//
// API Endpoints (relative to the configured base URL):
// - Stations:       GET  /api/stations
// - Route predict:  POST /api/predict-route   {"source": "lat,lon", "destination": "lat,lon"}
// - Health:         GET  /health

use log::{debug, info, warn};
use reqwest::blocking;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// Data Structures
// ============================================================================

/// Canonical station record. Coordinates are `NAN` when the source value
/// was missing or unparseable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub route_index: u32,
    pub avg_forecast_pm2_5: Option<Vec<f64>>,
    pub max_forecast_pm2_5: Option<Vec<f64>>,
    pub waypoints: usize,
}

/// Parsed body of a successful `/api/predict-route` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionResult {
    pub routes: Vec<RouteEntry>,
    /// Raw geometry as sent by the backend (longitude-first pairs).
    pub geometry: Option<Value>,
    pub gemini_summary: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    source: &'a str,
    destination: &'a str,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AAError {
    NetworkError(String),
    HttpStatus(u16),
    ParseError(String),
    InputError(String),
    FileError(String),
}

impl std::fmt::Display for AAError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AAError::NetworkError(e) => write!(f, "Network error: {}", e),
            AAError::HttpStatus(code) => write!(f, "API returned error status: {}", code),
            AAError::ParseError(e) => write!(f, "Parse error: {}", e),
            AAError::InputError(e) => write!(f, "Invalid input: {}", e),
            AAError::FileError(e) => write!(f, "File error: {}", e),
        }
    }
}

impl std::error::Error for AAError {}

pub type Result<T> = std::result::Result<T, AAError>;

// ============================================================================
// Station normalization
// ============================================================================

const ID_FIELDS: [&str; 2] = ["station_id", "StationId"];
const NAME_FIELDS: [&str; 2] = ["station_name", "StationName"];
const LAT_FIELDS: [&str; 2] = ["latitude", "Latitude"];
const LON_FIELDS: [&str; 2] = ["longitude", "Longitude"];

/// First usable value among `fields`, in order. Null and blank strings
/// count as absent.
fn first_present<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|v| !v.is_null() && v.as_str().is_none_or(|s| !s.trim().is_empty()))
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_coordinate(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Normalize one station record. Snake-case fields win over capitalized
/// ones; a missing name falls back to the identifier. Never fails.
pub fn normalize_station(record: &Value) -> Station {
    let id = first_present(record, &ID_FIELDS)
        .and_then(value_as_text)
        .unwrap_or_default();

    let name = first_present(record, &NAME_FIELDS)
        .and_then(value_as_text)
        .unwrap_or_else(|| id.clone());

    Station {
        lat: value_as_coordinate(first_present(record, &LAT_FIELDS)),
        lon: value_as_coordinate(first_present(record, &LON_FIELDS)),
        id,
        name,
    }
}

pub fn normalize_stations(records: &[Value]) -> Vec<Station> {
    records.iter().map(normalize_station).collect()
}

impl Station {
    pub fn has_valid_position(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn coordinate_string(&self) -> String {
        coordinate_string(self.lat, self.lon)
    }

    pub fn same_station(&self, other: &Station) -> bool {
        !self.id.is_empty() && self.id == other.id
    }
}

/// `"lat,lon"` as expected by the predict endpoint.
pub fn coordinate_string(lat: f64, lon: f64) -> String {
    format!("{},{}", lat, lon)
}

/// Parse a user-supplied `"lat,lon"` pair.
pub fn parse_coordinate_pair(input: &str) -> Result<(f64, f64)> {
    let mut parts = input.split(',').map(str::trim);
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat, lon),
        _ => {
            return Err(AAError::InputError(format!(
                "'{}' must be in 'lat,lon' form",
                input
            )))
        }
    };

    let lat: f64 = lat
        .parse()
        .map_err(|_| AAError::InputError(format!("invalid latitude '{}'", lat)))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| AAError::InputError(format!("invalid longitude '{}'", lon)))?;

    if !lat.is_finite() || !lon.is_finite() {
        return Err(AAError::InputError(format!("'{}' is not a finite coordinate", input)));
    }

    Ok((lat, lon))
}

// ============================================================================
// Prediction response parsing
// ============================================================================

fn forecast_series(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()
        .map(|arr| arr.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
}

impl PredictionResult {
    /// Build from a decoded response body. Missing or malformed optional
    /// fields are replaced by empty values.
    pub fn from_json(json: &Value) -> Self {
        let routes = json["routes"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter(|route| route.is_object())
                    .enumerate()
                    .map(|(position, route)| RouteEntry {
                        route_index: route["route_index"]
                            .as_u64()
                            .and_then(|i| u32::try_from(i).ok())
                            .unwrap_or(position as u32 + 1),
                        avg_forecast_pm2_5: forecast_series(&route["avg_forecast_pm2_5"]),
                        max_forecast_pm2_5: forecast_series(&route["max_forecast_pm2_5"]),
                        waypoints: route["waypoints"].as_u64().unwrap_or(0) as usize,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let geometry = match json.get("geometry") {
            Some(Value::Null) | None => None,
            Some(g) => Some(g.clone()),
        };

        let gemini_summary = json["gemini_summary"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        PredictionResult {
            routes,
            geometry,
            gemini_summary,
        }
    }
}

pub fn parse_stations_body(body: &str) -> Result<Vec<Station>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let json: Value = serde_json::from_str(body)
        .map_err(|e| AAError::ParseError(format!("Invalid JSON response: {}", e)))?;

    match json {
        Value::Null => Ok(Vec::new()),
        Value::Array(records) => Ok(normalize_stations(&records)),
        other => Err(AAError::ParseError(format!(
            "Expected a station array, got {}",
            json_kind(&other)
        ))),
    }
}

pub fn parse_prediction_body(body: &str) -> Result<PredictionResult> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| AAError::ParseError(format!("Invalid JSON response: {}", e)))?;

    if !json.is_object() {
        return Err(AAError::ParseError(format!(
            "Expected a prediction object, got {}",
            json_kind(&json)
        )));
    }

    Ok(PredictionResult::from_json(&json))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// API Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct AirAwareClient {
    base_url: String,
    http: blocking::Client,
}

impl AirAwareClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:8000";
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AAError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(AirAwareClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read_body(response: blocking::Response, what: &str) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            warn!("{} request failed with status {}", what, status);
            return Err(AAError::HttpStatus(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| AAError::NetworkError(format!("Failed to read {} response: {}", what, e)))
    }

    /// Fetch and normalize the station list. A null body is an empty list.
    pub fn list_stations(&self) -> Result<Vec<Station>> {
        let url = self.endpoint("/api/stations");
        debug!("GET {}", url);

        let response = self.http.get(&url).send().map_err(|e| {
            AAError::NetworkError(format!(
                "Failed to fetch stations: {}. Is the backend running?",
                e
            ))
        })?;

        let body = Self::read_body(response, "stations")?;
        let stations = parse_stations_body(&body)?;

        let unplaced = stations.iter().filter(|s| !s.has_valid_position()).count();
        info!("Loaded {} stations ({} without coordinates)", stations.len(), unplaced);

        Ok(stations)
    }

    pub fn predict_route(&self, source: &str, destination: &str) -> Result<PredictionResult> {
        let url = self.endpoint("/api/predict-route");
        debug!("POST {} source={} destination={}", url, source, destination);

        let response = self
            .http
            .post(&url)
            .json(&PredictRequest { source, destination })
            .send()
            .map_err(|e| AAError::NetworkError(format!("Failed to request route prediction: {}", e)))?;

        let body = Self::read_body(response, "predict-route")?;
        let result = parse_prediction_body(&body)?;

        info!(
            "Prediction received: {} route(s), geometry {}, summary {}",
            result.routes.len(),
            if result.geometry.is_some() { "present" } else { "absent" },
            if result.gemini_summary.is_some() { "present" } else { "absent" },
        );

        Ok(result)
    }

    /// True when the backend reports `{"status": "ok"}`.
    pub fn health(&self) -> Result<bool> {
        let url = self.endpoint("/health");
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| AAError::NetworkError(format!("Failed to reach backend: {}", e)))?;

        let body = Self::read_body(response, "health")?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| AAError::ParseError(format!("Invalid JSON response: {}", e)))?;

        Ok(json["status"].as_str() == Some("ok"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc::{channel, Receiver};
    use std::thread;

    /// Serve exactly one HTTP response and hand back the raw request text.
    fn one_shot_server(status_line: &str, body: &str) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let (tx, rx) = channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        });

        (format!("http://{}", addr), rx)
    }

    fn client(base: &str) -> AirAwareClient {
        AirAwareClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn normalizer_is_convention_independent() {
        let snake = json!({
            "station_id": "DL001",
            "station_name": "Anand Vihar",
            "latitude": 28.6469,
            "longitude": 77.3164
        });
        let capitalized = json!({
            "StationId": "DL001",
            "StationName": "Anand Vihar",
            "Latitude": 28.6469,
            "Longitude": 77.3164
        });

        assert_eq!(normalize_station(&snake), normalize_station(&capitalized));
    }

    #[test]
    fn normalizer_prefers_snake_case_fields() {
        let record = json!({
            "station_id": "A1",
            "StationId": "B2",
            "station_name": null,
            "StationName": "Capitalized Name",
            "latitude": "12.5",
            "Latitude": 99.0,
            "Longitude": "77.25"
        });

        let station = normalize_station(&record);
        assert_eq!(station.id, "A1");
        assert_eq!(station.name, "Capitalized Name");
        assert_eq!(station.lat, 12.5);
        assert_eq!(station.lon, 77.25);
    }

    #[test]
    fn normalizer_falls_back_to_id_for_name_and_nan_for_bad_coordinates() {
        let station = normalize_station(&json!({ "StationId": 42, "latitude": "n/a" }));

        assert_eq!(station.id, "42");
        assert_eq!(station.name, "42");
        assert!(station.lat.is_nan());
        assert!(station.lon.is_nan());
        assert!(!station.has_valid_position());
    }

    #[test]
    fn blank_snake_case_values_fall_back() {
        let named = normalize_station(&json!({ "station_id": "A1", "station_name": "" }));
        assert_eq!(named.id, "A1");
        assert_eq!(named.name, "A1");

        let keyed = normalize_station(&json!({
            "station_id": "  ",
            "StationId": "X9",
            "station_name": " ",
            "StationName": "Capitalized"
        }));
        assert_eq!(keyed.id, "X9");
        assert_eq!(keyed.name, "Capitalized");
        assert!(keyed.same_station(&keyed.clone()));
    }

    #[test]
    fn oversized_route_index_uses_position() {
        let result = parse_prediction_body(
            r#"{"routes": [{"route_index": 1}, {"route_index": 4294967296, "waypoints": 2}]}"#,
        )
        .unwrap();

        assert_eq!(result.routes[0].route_index, 1);
        assert_eq!(result.routes[1].route_index, 2);
    }

    #[test]
    fn empty_record_does_not_panic() {
        let station = normalize_station(&json!({}));
        assert_eq!(station.id, "");
        assert!(!station.has_valid_position());
        assert!(!station.same_station(&station.clone()));
    }

    #[test]
    fn coordinate_pair_parsing() {
        assert_eq!(parse_coordinate_pair("28.61, 77.20").unwrap(), (28.61, 77.20));
        assert!(parse_coordinate_pair("28.61").is_err());
        assert!(parse_coordinate_pair("1,2,3").is_err());
        assert!(parse_coordinate_pair("abc,77").is_err());
        assert!(parse_coordinate_pair("NaN,77").is_err());
    }

    #[test]
    fn coordinate_string_is_lat_first() {
        let station = Station {
            id: "x".to_string(),
            name: "x".to_string(),
            lat: 28.5,
            lon: 77.25,
        };
        assert_eq!(station.coordinate_string(), "28.5,77.25");
        assert_eq!(coordinate_string(28.5, 77.25), station.coordinate_string());
    }

    #[test]
    fn stations_body_null_or_empty_is_empty_list() {
        assert!(parse_stations_body("null").unwrap().is_empty());
        assert!(parse_stations_body("").unwrap().is_empty());
        assert!(parse_stations_body("[]").unwrap().is_empty());
        assert!(parse_stations_body("{\"oops\": 1}").is_err());
    }

    #[test]
    fn prediction_body_tolerates_missing_fields() {
        let result = parse_prediction_body(
            r#"{"routes": [{"route_index": 2, "avg_forecast_pm2_5": "bad", "waypoints": 3}, "junk"]}"#,
        )
        .unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].route_index, 2);
        assert_eq!(result.routes[0].avg_forecast_pm2_5, None);
        assert_eq!(result.routes[0].max_forecast_pm2_5, None);
        assert_eq!(result.routes[0].waypoints, 3);
        assert!(result.geometry.is_none());
        assert!(result.gemini_summary.is_none());

        let empty = parse_prediction_body("{}").unwrap();
        assert!(empty.routes.is_empty());
        assert!(parse_prediction_body("[1, 2]").is_err());
    }

    #[test]
    fn list_stations_against_local_server() {
        let (base, rx) = one_shot_server(
            "200 OK",
            r#"[{"station_id": "S1", "station_name": "One", "latitude": 1.5, "longitude": 2.5},
                {"StationId": "S2", "Latitude": "bad", "Longitude": 3.0}]"#,
        );

        let stations = client(&base).list_stations().unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "One");
        assert_eq!(stations[1].name, "S2");

        let request = rx.recv().unwrap();
        assert!(request.starts_with("GET /api/stations "));
    }

    #[test]
    fn list_stations_null_body_is_empty() {
        let (base, _rx) = one_shot_server("200 OK", "null");
        assert!(client(&base).list_stations().unwrap().is_empty());
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", r#"{"detail": "boom"}"#);

        match client(&base).list_stations() {
            Err(AAError::HttpStatus(500)) => {}
            other => panic!("expected HttpStatus(500), got {:?}", other),
        }
    }

    #[test]
    fn predict_route_posts_coordinate_strings() {
        let (base, rx) = one_shot_server(
            "200 OK",
            r#"{"routes": [{"route_index": 1, "avg_forecast_pm2_5": [5.2], "max_forecast_pm2_5": [9.1], "waypoints": 4}],
                "gemini_summary": "Route 1 recommended."}"#,
        );

        let result = client(&base).predict_route("28.6,77.2", "28.7,77.3").unwrap();
        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.gemini_summary.as_deref(), Some("Route 1 recommended."));

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /api/predict-route "));
        let body_start = request.find("\r\n\r\n").unwrap() + 4;
        let body: Value = serde_json::from_str(&request[body_start..]).unwrap();
        assert_eq!(body, json!({"source": "28.6,77.2", "destination": "28.7,77.3"}));
    }

    #[test]
    fn health_reports_ok_status() {
        let (base, _rx) = one_shot_server("200 OK", r#"{"status": "ok"}"#);
        assert!(client(&base).health().unwrap());
    }

    #[test]
    fn unreachable_backend_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        match client(&format!("http://{}", addr)).list_stations() {
            Err(AAError::NetworkError(_)) => {}
            other => panic!("expected NetworkError, got {:?}", other),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = client("http://localhost:8000/");
        assert_eq!(c.base_url(), "http://localhost:8000");
        assert_eq!(c.endpoint("/health"), "http://localhost:8000/health");
    }
}
