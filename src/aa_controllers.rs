// Controllers for the AirAware terminal front end
use crate::aa_models::{AirAwareClient, Station};
use crate::aa_state::AppState;
use crate::aa_views::AAViews;
use log::{error, info};
use std::io::{self, Write};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    fn label(self) -> &'static str {
        match self {
            Endpoint::Start => "Start",
            Endpoint::End => "End",
        }
    }
}

pub struct AAControllers {
    client: AirAwareClient,
    state: AppState,
}

impl AAControllers {
    pub fn new(client: AirAwareClient) -> Self {
        AAControllers {
            client,
            state: AppState::new(),
        }
    }

    /// Main application loop
    pub fn run(&mut self) {
        AAViews::show_welcome(self.client.base_url());

        println!("\n🔄 Loading stations...");
        self.load_stations();

        loop {
            AAViews::show_menu(&self.state);

            let choice = Self::read_input();

            match choice.trim() {
                "1" => {
                    self.handle_station_selection(Endpoint::Start);
                    Self::pause();
                }
                "2" => {
                    self.handle_station_selection(Endpoint::End);
                    Self::pause();
                }
                "3" => {
                    self.state.swap();
                    println!("\n✓ Start and end swapped");
                }
                "4" => {
                    self.handle_predict();
                    Self::pause();
                }
                "5" => {
                    AAViews::show_prediction(&self.state);
                    Self::pause();
                }
                "6" => {
                    AAViews::show_all_stations(self.state.stations(), self.state.selection());
                    Self::pause();
                }
                "7" => {
                    self.load_stations();
                    Self::pause();
                }
                "0" => {
                    AAViews::goodbye_message();
                    break;
                }
                "" => {}
                _ => {
                    println!("\n✗ Invalid option '{}'. Please select 0-7.", choice.trim());
                    Self::pause();
                }
            }
        }
    }

    /// Fetch stations once. Failure is reported and not retried.
    fn load_stations(&mut self) {
        match self.client.list_stations() {
            Ok(stations) => {
                println!("✓ Loaded {} stations", stations.len());
                self.state.set_stations(stations);
            }
            Err(e) => {
                error!("Station load failed: {}", e);
                AAViews::network_error(&format!("Failed to load stations: {}", e));
            }
        }
    }

    fn handle_station_selection(&mut self, endpoint: Endpoint) {
        let input = AAViews::prompt_station(&endpoint.label().to_lowercase());

        if input.is_empty() {
            self.assign(endpoint, None);
            AAViews::show_station_cleared(endpoint.label());
            return;
        }

        let station = match self.resolve_station(&input) {
            Some(station) => station,
            None => {
                AAViews::invalid_station(&input);
                return;
            }
        };

        AAViews::show_station_selected(endpoint.label(), &station);
        self.assign(endpoint, Some(station));
    }

    fn assign(&mut self, endpoint: Endpoint, station: Option<Station>) {
        match endpoint {
            Endpoint::Start => self.state.set_start(station),
            Endpoint::End => self.state.set_end(station),
        }
    }

    /// Exact id match first, then partial name/id search.
    fn resolve_station(&self, input: &str) -> Option<Station> {
        if let Some(exact) = self.state.find_station(input) {
            return Some(exact.clone());
        }

        let matches = self.state.search_stations(input);
        match matches.len() {
            0 => None,
            1 => Some(matches[0].clone()),
            _ => {
                AAViews::show_station_choices(&matches);
                Self::select_from_list(&matches).cloned()
            }
        }
    }

    fn handle_predict(&mut self) {
        let (source, destination) = match self.state.predict_request() {
            Some(request) => request,
            None => {
                AAViews::cannot_predict();
                return;
            }
        };

        info!("Predicting route {} -> {}", source, destination);
        self.state.set_loading(true);
        AAViews::show_loading("Predicting route");

        let outcome = self.client.predict_route(&source, &destination);

        AAViews::clear_loading();
        self.state.set_loading(false);

        match outcome {
            Ok(result) => {
                self.state.set_result(result);
                AAViews::show_prediction(&self.state);
            }
            Err(e) => {
                error!("Prediction failed: {}", e);
                AAViews::network_error(&format!("Route prediction failed: {}", e));
            }
        }
    }

    /// Simple pause - wait for Enter key
    fn pause() {
        print!("\n📌 Press Enter to continue...");
        let _ = io::stdout().flush();
        let mut dummy = String::new();
        let _ = io::stdin().read_line(&mut dummy);
    }

    fn select_from_list<'a>(items: &[&'a Station]) -> Option<&'a Station> {
        print!("\n➜ Enter number (1-{}): ", items.len());
        let _ = io::stdout().flush();

        let input = Self::read_input();

        match Self::parse_choice(&input, items.len()) {
            Some(index) => Some(items[index]),
            None => {
                println!("✗ Invalid selection. Please enter a number between 1 and {}", items.len());
                None
            }
        }
    }

    /// 1-based menu choice to a 0-based index.
    fn parse_choice(input: &str, len: usize) -> Option<usize> {
        match input.trim().parse::<usize>() {
            Ok(num) if num > 0 && num <= len => Some(num - 1),
            _ => None,
        }
    }

    fn read_input() -> String {
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => input,
            Err(e) => {
                eprintln!("⚠️  Error reading input: {}", e);
                String::new()
            }
        }
    }
}
