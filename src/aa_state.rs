// Selection and request-lifecycle state shared by the terminal and GUI front ends
use crate::aa_models::{PredictionResult, Station};
use chrono::{DateTime, Local};
use log::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub start: Option<Station>,
    pub end: Option<Station>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    stations: Vec<Station>,
    selection: Selection,
    result: Option<PredictionResult>,
    result_received_at: Option<DateTime<Local>>,
    loading: bool,
    error: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Stations
    // ------------------------------------------------------------------

    pub fn set_stations(&mut self, stations: Vec<Station>) {
        info!("Station list replaced ({} stations)", stations.len());
        self.stations = stations;
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn find_station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Case-insensitive partial match on name or id.
    pub fn search_stations(&self, query: &str) -> Vec<&Station> {
        let query = query.trim().to_lowercase();
        self.stations
            .iter()
            .filter(|s| {
                query.is_empty()
                    || s.name.to_lowercase().contains(&query)
                    || s.id.to_lowercase().contains(&query)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn set_start(&mut self, station: Option<Station>) {
        debug!("Start station: {:?}", station.as_ref().map(|s| &s.id));
        self.selection.start = station;
    }

    pub fn set_end(&mut self, station: Option<Station>) {
        debug!("End station: {:?}", station.as_ref().map(|s| &s.id));
        self.selection.end = station;
    }

    pub fn swap(&mut self) {
        let selection = &mut self.selection;
        std::mem::swap(&mut selection.start, &mut selection.end);
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn can_predict(&self) -> bool {
        self.selection.is_complete()
    }

    /// `(source, destination)` coordinate strings, only when both ends are set.
    pub fn predict_request(&self) -> Option<(String, String)> {
        match (&self.selection.start, &self.selection.end) {
            (Some(start), Some(end)) => Some((start.coordinate_string(), end.coordinate_string())),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Result / loading / notification
    // ------------------------------------------------------------------

    /// Replaces any earlier result. The last response to arrive wins.
    pub fn set_result(&mut self, result: PredictionResult) {
        self.result = Some(result);
        self.result_received_at = Some(Local::now());
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn result_received_at(&self) -> Option<DateTime<Local>> {
        self.result_received_at
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The predict trigger is enabled only with a full selection and no
    /// outstanding request.
    pub fn predict_enabled(&self) -> bool {
        self.can_predict() && !self.loading
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {}", id),
            lat: 28.0,
            lon: 77.0,
        }
    }

    #[test]
    fn can_predict_requires_both_ends() {
        let options = [None, Some(station("a"))];
        for start in &options {
            for end in &options {
                let mut state = AppState::new();
                state.set_start(start.clone());
                state.set_end(end.clone());
                assert_eq!(state.can_predict(), start.is_some() && end.is_some());
                assert_eq!(state.predict_request().is_some(), state.can_predict());
            }
        }
    }

    #[test]
    fn predict_request_uses_lat_lon_strings() {
        let mut state = AppState::new();
        state.set_start(Some(Station { lat: 1.5, lon: 2.5, ..station("s") }));
        state.set_end(Some(Station { lat: -3.0, lon: 4.0, ..station("e") }));

        assert_eq!(
            state.predict_request(),
            Some(("1.5,2.5".to_string(), "-3,4".to_string()))
        );
    }

    #[test]
    fn clearing_a_side_disables_prediction() {
        let mut state = AppState::new();
        state.set_start(Some(station("a")));
        state.set_end(Some(station("b")));
        assert!(state.can_predict());

        state.set_end(None);
        assert!(!state.can_predict());
        assert_eq!(state.selection().start.as_ref().map(|s| s.id.as_str()), Some("a"));
    }

    #[test]
    fn loading_disables_trigger() {
        let mut state = AppState::new();
        state.set_start(Some(station("a")));
        state.set_end(Some(station("b")));
        assert!(state.predict_enabled());

        state.set_loading(true);
        assert!(state.can_predict());
        assert!(!state.predict_enabled());
    }

    #[test]
    fn swap_exchanges_ends() {
        let mut state = AppState::new();
        state.set_start(Some(station("a")));
        state.swap();
        assert!(state.selection().start.is_none());
        assert_eq!(state.selection().end.as_ref().map(|s| s.id.as_str()), Some("a"));
    }

    #[test]
    fn newer_result_replaces_older() {
        let mut state = AppState::new();
        assert!(state.result().is_none());
        assert!(state.result_received_at().is_none());

        state.set_result(PredictionResult {
            gemini_summary: Some("first".to_string()),
            ..Default::default()
        });
        state.set_result(PredictionResult {
            gemini_summary: Some("second".to_string()),
            ..Default::default()
        });

        assert_eq!(
            state.result().and_then(|r| r.gemini_summary.as_deref()),
            Some("second")
        );
        assert!(state.result_received_at().is_some());
    }

    #[test]
    fn search_matches_name_or_id() {
        let mut state = AppState::new();
        state.set_stations(vec![
            Station { name: "Anand Vihar".to_string(), ..station("DL001") },
            Station { name: "ITO".to_string(), ..station("DL002") },
        ]);

        assert_eq!(state.search_stations("vihar").len(), 1);
        assert_eq!(state.search_stations("dl00").len(), 2);
        assert_eq!(state.search_stations("").len(), 2);
        assert_eq!(state.find_station("DL002").map(|s| s.name.as_str()), Some("ITO"));
    }

    #[test]
    fn unplaced_station_stays_selectable() {
        let mut state = AppState::new();
        state.set_stations(vec![Station { lat: f64::NAN, ..station("NOPOS") }]);

        assert_eq!(state.search_stations("nopos").len(), 1);
        assert!(crate::aa_overlay::renderable_markers(state.stations(), state.selection()).is_empty());
    }

    #[test]
    fn error_notification_lifecycle() {
        let mut state = AppState::new();
        state.notify_error("backend down");
        assert_eq!(state.error(), Some("backend down"));
        state.dismiss_error();
        assert!(state.error().is_none());
    }
}
