// Entry point and interactive console flow.
//
// The console stands in for the browser dashboard:
// - Startup tries the configured sources once (or the --file given).
// - The menu drives refresh, local-file loading, filters, sorting, top-N,
//   rendering and report export.
// - Every action catches its own errors and leaves the loaded data alone.
use clap::Parser;
use log::error;
use member_dashboard::config::Config;
use member_dashboard::filter::{FilterCriteria, PaymentFilter, SubmissionFilter};
use member_dashboard::loader;
use member_dashboard::options::LocationSelection;
use member_dashboard::output;
use member_dashboard::sort::SortKey;
use member_dashboard::state::{Dashboard, LoadOutcome};
use member_dashboard::util::{format_int, locale_or_default};
use member_dashboard::Result;
use num_format::Locale;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

struct App<R> {
    config: Config,
    dash: Dashboard,
    locale: Locale,
    input: R,
}

#[derive(Serialize)]
struct Summary<'a> {
    source: Option<&'a str>,
    generation: u64,
    generated_on: String,
    kpis: member_dashboard::types::Kpis,
    filters: &'a FilterCriteria,
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    }
    builder.format_timestamp(None).init();
}

impl<R: BufRead> App<R> {
    fn new(config: Config, input: R) -> Self {
        let locale = locale_or_default(&config.locale);
        let dash = Dashboard::new(config.top_n, config.ranking_top_n());
        App {
            config,
            dash,
            locale,
            input,
        }
    }

    /// Print `label` and read one trimmed line. `None` once input is closed.
    fn prompt(&mut self, label: &str) -> Option<String> {
        print!("{}", label);
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match self.input.read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.trim().to_string()),
            Err(e) => {
                error!("reading input failed: {}", e);
                None
            }
        }
    }

    fn read_choice(&mut self) -> Option<String> {
        self.prompt("Enter choice: ")
    }

    /// Comma-separated picks, keeping only values that are on offer.
    fn prompt_picks(
        &mut self,
        label: &str,
        offered: &[String],
        current: &BTreeSet<String>,
    ) -> Option<BTreeSet<String>> {
        if offered.is_empty() {
            return Some(BTreeSet::new());
        }
        println!("{} options: {}", label, offered.join(", "));
        if !current.is_empty() {
            let kept: Vec<&str> = current.iter().map(String::as_str).collect();
            println!("(currently: {})", kept.join(", "));
        }
        let answer = self.prompt(&format!("{} (comma separated, blank = all, '.' = keep): ", label))?;
        if answer == "." {
            return Some(current.clone());
        }
        let picks = answer
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let ok = offered.iter().any(|o| o == s);
                if !ok {
                    println!("Ignoring unknown {} '{}'", label.to_lowercase(), s);
                }
                ok
            })
            .map(str::to_string)
            .collect();
        Some(picks)
    }

    fn today() -> chrono::NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn load_with(&mut self, load: impl FnOnce() -> Result<loader::LoadedData>) -> bool {
        let ticket = self.dash.begin_load();
        match self.dash.finish_load(ticket, load()) {
            Ok(LoadOutcome::Committed { records, .. }) => {
                let source = self.dash.source_name().unwrap_or("source");
                println!(
                    "Loaded {} records from {}",
                    format_int(records, &self.locale),
                    source
                );
                if let Some(report) = self.dash.load_report() {
                    if report.dropped() > 0 {
                        println!(
                            "Note: {} rows skipped ({} placeholder locations, {} rejected memberships).",
                            format_int(report.dropped(), &self.locale),
                            format_int(report.placeholder_location, &self.locale),
                            format_int(report.rejected_membership, &self.locale)
                        );
                    }
                }
                println!();
                true
            }
            Ok(LoadOutcome::Stale) => false,
            Err(e) => {
                error!("load failed: {}", e);
                println!("Error: {}\n", e);
                false
            }
        }
    }

    fn handle_refresh(&mut self) -> bool {
        let candidates = self.config.candidates();
        self.load_with(|| loader::load_first_available(&candidates))
    }

    fn handle_open_file(&mut self, path: &Path) -> bool {
        self.load_with(|| loader::load_local_file(path))
    }

    fn require_data(&self) -> bool {
        if !self.dash.is_loaded() {
            println!("Error: No data loaded. Refresh (1) or open a file (2) first.\n");
            return false;
        }
        true
    }

    /// Walk the filter prompts and commit the result. `None` when input
    /// closes part way; nothing is applied then.
    fn handle_edit_filters(&mut self) -> Option<()> {
        if !self.require_data() {
            return Some(());
        }
        let current = self.dash.criteria().clone();
        let mut selection = LocationSelection {
            districts: current.districts.clone(),
            zones: current.zones.clone(),
            units: current.units.clone(),
        };

        let opts = self.dash.location_options(&selection);
        selection.districts = self.prompt_picks("District", &opts.districts, &opts.selection.districts)?;
        let opts = self.dash.location_options(&selection);
        selection = opts.selection.clone();
        selection.zones = self.prompt_picks("Zone", &opts.zones, &opts.selection.zones)?;
        let opts = self.dash.location_options(&selection);
        selection = opts.selection.clone();
        selection.units = self.prompt_picks("Unit", &opts.units, &opts.selection.units)?;

        let payment = loop {
            match self.prompt("Payment (paid/unpaid, blank = any): ")?.parse::<PaymentFilter>() {
                Ok(p) => break p,
                Err(e) => println!("{}", e),
            }
        };
        let submitted = loop {
            match self
                .prompt("Submission (submitted/pending, blank = any): ")?
                .parse::<SubmissionFilter>()
            {
                Ok(s) => break s,
                Err(e) => println!("{}", e),
            }
        };
        let op = self.prompt("Unit size operator (>, <, >=, <=, =, blank = none): ")?;
        let value = if op.is_empty() {
            String::new()
        } else {
            self.prompt("Unit size value: ")?
        };

        let criteria = FilterCriteria {
            districts: selection.districts,
            zones: selection.zones,
            units: selection.units,
            payment,
            submitted,
            ..Default::default()
        }
        .with_unit_count(&op, &value);
        self.dash.apply_filters(criteria);
        println!("Filters applied.\n");
        Some(())
    }

    fn handle_sort(&mut self) -> Option<()> {
        let keys: Vec<&str> = SortKey::ALL.iter().map(|k| k.name()).collect();
        println!("Sort by: {}", keys.join(", "));
        match self.prompt("Column: ")?.parse::<SortKey>() {
            Ok(key) => {
                self.dash.select_sort(key);
                let s = self.dash.sort_state();
                println!("Sorting by {} ({:?}).\n", s.key, s.direction);
            }
            Err(e) => println!("{}\n", e),
        }
        Some(())
    }

    fn read_limit(&mut self, label: &str) -> Option<Option<usize>> {
        let answer = self.prompt(label)?;
        if answer.is_empty() {
            return Some(None);
        }
        match answer.parse::<usize>() {
            Ok(n) => Some(Some(n)),
            Err(_) => {
                println!("Invalid number.");
                Some(None)
            }
        }
    }

    /// Blank keeps the current value for either limit.
    fn handle_top_n(&mut self) -> Option<()> {
        let table = format!("Unit table rows (now {}): ", self.dash.table_top_n());
        if let Some(n) = self.read_limit(&table)? {
            self.dash.set_table_top_n(n);
        }
        let ranking = format!("Ranking entries (now {}): ", self.dash.ranking_top_n());
        if let Some(n) = self.read_limit(&ranking)? {
            self.dash.set_ranking_top_n(n);
        }
        println!(
            "Showing top {} units and top {} ranking entries.\n",
            self.dash.table_top_n(),
            self.dash.ranking_top_n()
        );
        Some(())
    }

    fn handle_render(&self) {
        if !self.require_data() {
            return;
        }
        let view = self.dash.view(Self::today());
        if !self.dash.criteria().is_empty() {
            println!("(Filtered view)\n");
        }
        output::print_kpis(&view.kpis, &self.locale);
        output::preview_table("Members by District", None, &view.by_district, usize::MAX);
        output::preview_table("Members by Zone", None, &view.by_zone, usize::MAX);
        let s = self.dash.sort_state();
        let note = format!("Top {} by {} {:?}", self.dash.table_top_n(), s.key, s.direction);
        output::preview_table("Unit Summary", Some(&note), &view.unit_table, usize::MAX);
        if let Some(groups) = &view.age_groups {
            output::print_age_groups(groups, &self.locale);
        }
        if let Some(top) = &view.top_professions {
            output::preview_table("Top Professions", None, top, usize::MAX);
        }
        if let Some(top) = &view.top_qualifications {
            output::preview_table("Top Qualifications", None, top, usize::MAX);
        }
    }

    fn handle_export(&self) -> Result<()> {
        if !self.require_data() {
            return Ok(());
        }
        let today = Self::today();
        let view = self.dash.view(today);
        let dir = &self.config.out_dir;
        let rows = self.dash.filtered();
        let s = self.dash.sort_state();
        let all_units = member_dashboard::sort::sort_stats(
            &member_dashboard::reports::unit_stats(&rows),
            s.key,
            s.direction,
        );

        output::write_csv(&dir.join("units.csv"), &all_units)?;
        output::write_csv(&dir.join("zones.csv"), &view.zone_stats)?;
        output::write_csv(&dir.join("districts.csv"), &view.district_stats)?;
        output::write_text(&dir.join("units_table.html"), &output::unit_rows_html(&view.unit_table))?;
        output::write_json(&dir.join("charts.json"), &output::build_charts(&view))?;
        let summary = Summary {
            source: self.dash.source_name(),
            generation: self.dash.generation(),
            generated_on: today.to_string(),
            kpis: view.kpis,
            filters: self.dash.criteria(),
        };
        output::write_json(&dir.join("summary.json"), &summary)?;
        println!("Reports exported to {}\n", dir.display());
        Ok(())
    }

    fn startup_load(&mut self) -> bool {
        match self.config.file.clone() {
            Some(path) => self.handle_open_file(&path),
            None => self.handle_refresh(),
        }
    }
}

/// Runs until the user exits or the input closes.
fn run_menu<R: BufRead>(app: &mut App<R>) {
    loop {
        println!("Member Dashboard");
        println!("[1] Refresh from source");
        println!("[2] Open local file");
        println!("[3] Edit filters");
        println!("[4] Reset filters");
        println!("[5] Show dashboard");
        println!("[6] Sort unit table");
        println!("[7] Set top-N");
        println!("[8] Export reports");
        println!("[0] Exit\n");
        let Some(choice) = app.read_choice() else {
            println!();
            break;
        };
        let answered = match choice.as_str() {
            "1" => {
                app.handle_refresh();
                Some(())
            }
            "2" => app.prompt("File path: ").map(|path| {
                if !path.is_empty() {
                    app.handle_open_file(&PathBuf::from(path));
                }
            }),
            "3" => app.handle_edit_filters(),
            "4" => {
                app.dash.reset_filters();
                println!("Filters reset.\n");
                Some(())
            }
            "5" => {
                app.handle_render();
                Some(())
            }
            "6" => app.handle_sort(),
            "7" => app.handle_top_n(),
            "8" => {
                if let Err(e) = app.handle_export() {
                    error!("export failed: {}", e);
                    println!("Error: {}\n", e);
                }
                Some(())
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 0-8.\n");
                Some(())
            }
        };
        if answered.is_none() {
            println!();
            break;
        }
    }
}

fn main() {
    let config = Config::parse();
    init_logging(&config);
    let mut app = App::new(config, io::stdin().lock());

    if app.config.batch {
        if !app.startup_load() {
            std::process::exit(1);
        }
        app.handle_render();
        if let Err(e) = app.handle_export() {
            error!("export failed: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    app.startup_load();
    run_menu(&mut app);
}
