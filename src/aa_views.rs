// Terminal views for the AirAware route viewer
use crate::aa_models::Station;
use crate::aa_overlay::{self, Polyline};
use crate::aa_state::{AppState, Selection};
use crate::aa_summary::{self, RouteSummary, SummaryView};
use std::io::{self, Write};

pub struct AAViews;

impl AAViews {
    pub fn show_welcome(base_url: &str) {
        println!("\n{}", "═".repeat(70));
        println!("  ╔═══════════════════════════════════════════════════════════╗");
        println!("  ║            🌫️  AIRAWARE - CLEAN AIR ROUTE VIEWER           ║");
        println!("  ║          PM2.5 forecasts along your planned route         ║");
        println!("  ╚═══════════════════════════════════════════════════════════╝");
        println!("{}", "═".repeat(70));
        println!("\n  🌐 Backend: {}", base_url);
        println!("\n{}", "═".repeat(70));
    }

    pub fn show_menu(state: &AppState) {
        println!("\n{}", "═".repeat(60));
        println!("     🌫️  AIRAWARE ROUTE VIEWER");
        println!("{}", "═".repeat(60));
        Self::show_selection(state.selection());
        println!("\n📋 MENU OPTIONS");
        println!("  1️⃣  Select start station");
        println!("  2️⃣  Select end station");
        println!("  3️⃣  Swap start and end");
        if state.can_predict() {
            println!("  4️⃣  Predict route 🔮");
        } else {
            println!("  4️⃣  Predict route (select both stations first)");
        }
        println!("  5️⃣  Show last prediction");
        println!("  6️⃣  Browse all stations");
        println!("  7️⃣  Reload stations");
        println!("  0️⃣  Quit application");
        println!("\n{}", "─".repeat(60));
        print!("➜ Your choice: ");
        let _ = io::stdout().flush();
    }

    fn show_selection(selection: &Selection) {
        let describe = |s: &Option<Station>| match s {
            Some(station) => format!("{} ({})", station.name, station.id),
            None => "not selected".to_string(),
        };
        println!("  🟢 Start: {}", describe(&selection.start));
        println!("  🔴 End:   {}", describe(&selection.end));
    }

    pub fn prompt_station(role: &str) -> String {
        print!("\n📍 Enter {} station name or ID (empty to clear)\n", role);
        print!("➜ Station: ");
        let _ = io::stdout().flush();
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return String::new();
        }
        input.trim().to_string()
    }

    pub fn show_station_choices(stations: &[&Station]) {
        println!("\n📍 Multiple stations found. Please choose:");
        println!("{}", "─".repeat(60));
        for (i, station) in stations.iter().enumerate() {
            println!("  {}. {} (ID: {})", i + 1, station.name, station.id);
            println!("     📌 {}", Self::format_position(station));
        }
        println!("{}", "─".repeat(60));
    }

    pub fn show_station_selected(role: &str, station: &Station) {
        println!("\n{}", "─".repeat(60));
        println!("✓ {} station: {}", role, station.name);
        println!("  🆔 Station ID: {}", station.id);
        println!("  📌 Location: {}", Self::format_position(station));
        if !station.has_valid_position() {
            println!("  ⚠️  No usable coordinates; this station will not appear on the map");
        }
        println!("{}", "─".repeat(60));
    }

    pub fn show_station_cleared(role: &str) {
        println!("\n✓ {} station cleared", role);
    }

    pub fn invalid_station(input: &str) {
        println!("\n{}", "─".repeat(60));
        println!("✗ Station '{}' not found", input);
        println!("\n💡 Tips:");
        println!("  • Try a partial name (e.g., 'Vihar' for 'Anand Vihar')");
        println!("  • Station IDs work too");
        println!("  • Use option 6 to browse all stations");
        println!("{}", "─".repeat(60));
    }

    pub fn cannot_predict() {
        println!("\n{}", "─".repeat(60));
        println!("✗ Both a start and an end station are required");
        println!("\n💡 Use options 1 and 2 to pick them");
        println!("{}", "─".repeat(60));
    }

    pub fn show_all_stations(stations: &[Station], selection: &Selection) {
        println!("\n{}", "═".repeat(70));
        println!("📍 ALL STATIONS ({} total)", stations.len());
        println!("{}", "═".repeat(70));

        if stations.is_empty() {
            println!("\n  No stations loaded.");
            return;
        }

        for (idx, station) in stations.iter().enumerate() {
            let flags = aa_overlay::highlight(station, selection);
            let badge = match (flags.is_start, flags.is_end) {
                (true, true) => " [START/END]",
                (true, false) => " [START]",
                (false, true) => " [END]",
                (false, false) => "",
            };
            println!(
                "  {:>4}. {} (ID: {}){}",
                idx + 1,
                station.name,
                station.id,
                badge
            );
            println!("        📌 {}", Self::format_position(station));
        }

        let hidden = stations.iter().filter(|s| !s.has_valid_position()).count();
        if hidden > 0 {
            println!("\n  ⚠️  {} station(s) lack coordinates and are hidden from the map", hidden);
        }
        println!("{}", "═".repeat(70));
    }

    pub fn show_prediction(state: &AppState) {
        println!("\n{}", "═".repeat(70));
        println!("🔮 ROUTE PREDICTION");
        if let Some(at) = state.result_received_at() {
            println!("📅 Received {}", at.format("%A, %B %d, %Y at %H:%M:%S"));
        }
        println!("{}", "═".repeat(70));

        let rows = match aa_summary::summarize(state.result()) {
            SummaryView::NoResultYet => {
                println!("\n  No prediction yet. Select two stations and use option 4.");
                println!("{}", "═".repeat(70));
                return;
            }
            SummaryView::NoValidPredictions => {
                println!("\n  ⚠️  No valid predictions were returned for this route.");
                Vec::new()
            }
            SummaryView::Routes(rows) => rows,
        };

        if !rows.is_empty() {
            Self::show_route_table(&rows);
        }

        if let Some(result) = state.result() {
            let overlays = aa_overlay::build_overlays(result);
            Self::show_overlay_info(&overlays);

            println!("\n🤖 AI SUMMARY");
            println!("{}", "─".repeat(70));
            match &result.gemini_summary {
                Some(summary) => println!("  {}", summary),
                None => println!("  No summary available."),
            }
        }

        println!("{}", "═".repeat(70));
    }

    fn show_route_table(rows: &[RouteSummary]) {
        let best = aa_summary::cleanest_route(rows).map(|r| r.index);

        println!("\n  {:<8} {:>12} {:>12} {:>10}", "Route", "Avg PM2.5", "Max PM2.5", "Waypoints");
        println!("  {}", "─".repeat(46));
        for row in rows {
            let marker = if Some(row.index) == best { " 🌿" } else { "" };
            println!(
                "  {:<8} {:>12} {:>12} {:>10}{}",
                row.index,
                aa_summary::format_value(row.avg),
                aa_summary::format_value(row.max),
                row.waypoints,
                marker
            );
        }
    }

    fn show_overlay_info(overlays: &[Polyline]) {
        if overlays.is_empty() {
            println!("\n  🗺️  No route geometry returned");
            return;
        }
        println!("\n  🗺️  {} route line(s) for the map:", overlays.len());
        for (i, line) in overlays.iter().enumerate() {
            match (line.first(), line.last()) {
                (Some(first), Some(last)) => println!(
                    "     {}. {} points, ({:.4}, {:.4}) → ({:.4}, {:.4})",
                    i + 1,
                    line.len(),
                    first[0],
                    first[1],
                    last[0],
                    last[1]
                ),
                _ => println!("     {}. empty", i + 1),
            }
        }
    }

    pub fn network_error(error: &str) {
        println!("\n{}", "═".repeat(60));
        println!("❌ REQUEST FAILED");
        println!("{}", "═".repeat(60));
        println!("\n{}", error);
        println!("\n💡 Troubleshooting:");
        println!("  • Check that the AirAware backend is running");
        println!("  • Verify --api-url / AIRAWARE_API_URL");
        println!("  • Try again in a few moments");
        println!("\n{}", "═".repeat(60));
    }

    pub fn show_loading(message: &str) {
        print!("\r🔄 {}...", message);
        let _ = io::stdout().flush();
    }

    pub fn clear_loading() {
        print!("\r{}\r", " ".repeat(60));
        let _ = io::stdout().flush();
    }

    pub fn goodbye_message() {
        println!("\n{}", "═".repeat(60));
        println!("       👋 Thank you for using AirAware!");
        println!("{}", "═".repeat(60));
        println!();
    }

    pub fn format_position(station: &Station) -> String {
        if station.has_valid_position() {
            format!("({:.6}, {:.6})", station.lat, station.lon)
        } else {
            "(no coordinates)".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_formatting() {
        let mut station = Station {
            id: "1".to_string(),
            name: "One".to_string(),
            lat: 28.5,
            lon: 77.25,
        };
        assert_eq!(AAViews::format_position(&station), "(28.500000, 77.250000)");

        station.lat = f64::NAN;
        assert_eq!(AAViews::format_position(&station), "(no coordinates)");
    }
}
