//! dashboard-runner: headless driver for the dashboard data engine.
//!
//! Usage:
//!   dashboard-runner --seed 12345 --time-range month --province sichuan
//!   dashboard-runner --config engine.json --ipc-mode
//!
//! In IPC mode every stdin line is one JSON request and every reply is
//! one JSON line on stdout.

use anyhow::Result;
use dashboard_core::{
    config::EngineConfig,
    engine::DashboardEngine,
    error::EngineResult,
    filter::{FilterCriteria, TimeRange},
    region::RegionLevel,
    snapshot::DashboardSnapshot,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetData {
        #[serde(default)]
        filters: FilterCriteria,
    },
    RegionChildren {
        parent_code: String,
        level: RegionLevel,
    },
    Reset,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match str_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.generation.seed = parse_arg(&args, "--seed", config.generation.seed);
    config.simulated_latency_ms = parse_arg(&args, "--latency-ms", config.simulated_latency_ms);

    let engine = DashboardEngine::with_system_clock(config)?;

    if ipc_mode {
        run_ipc_loop(&engine)?;
    } else {
        let filters = filters_from_args(&args)?;
        println!("Dividend dashboard: dashboard-runner");
        println!("  seed:       {}", engine.config().generation.seed);
        println!("  time range: {:?}", filters.time_range);
        println!("  province:   {}", filters.province().unwrap_or("(all)"));
        println!("  round:      {}", filters.round);
        println!();

        let snapshot = engine.get_data(&filters)?;
        print_summary(&engine, &snapshot)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &DashboardEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    serve(engine, stdin.lock(), &mut stdout)
}

/// One JSON reply line per request line until `quit` or EOF.
/// Bad requests and engine failures both answer `{"error": ...}`
/// and the loop keeps serving.
fn serve(engine: &DashboardEngine, mut input: impl BufRead, output: &mut impl Write) -> Result<()> {
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = input.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<IpcCommand>(&buffer) {
            Ok(IpcCommand::Quit) => break,
            Ok(cmd) => respond(engine, cmd).unwrap_or_else(|e| {
                log::warn!("IPC request failed: {e}");
                error_reply(e)
            }),
            Err(e) => {
                log::warn!("Unparseable IPC request: {e}");
                error_reply(e)
            }
        };
        writeln!(output, "{reply}")?;
        output.flush()?;
    }
    Ok(())
}

fn respond(engine: &DashboardEngine, cmd: IpcCommand) -> EngineResult<serde_json::Value> {
    match cmd {
        IpcCommand::GetData { filters } => {
            let snapshot = engine.get_data(&filters)?;
            Ok(serde_json::to_value(snapshot.as_ref())?)
        }
        IpcCommand::RegionChildren { parent_code, level } => {
            let children = engine.region_children(&parent_code, level)?;
            Ok(serde_json::to_value(children)?)
        }
        IpcCommand::Reset => {
            engine.reset()?;
            Ok(serde_json::json!({ "ok": true }))
        }
        IpcCommand::Quit => Ok(serde_json::Value::Null),
    }
}

fn error_reply(err: impl std::fmt::Display) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string() })
}

fn filters_from_args(args: &[String]) -> Result<FilterCriteria> {
    let time_range = match str_arg(args, "--time-range") {
        Some(raw) => serde_json::from_value::<TimeRange>(serde_json::Value::String(raw.into()))?,
        None => TimeRange::default(),
    };
    let mut filters = FilterCriteria::new(time_range)
        .with_round(parse_arg(args, "--round", dashboard_core::filter::DEFAULT_ROUND));
    if let Some(province) = str_arg(args, "--province") {
        filters = filters.with_province(province);
    }
    if let Some(city) = str_arg(args, "--city") {
        filters = filters.with_city(city);
    }
    Ok(filters)
}

fn print_summary(engine: &DashboardEngine, snapshot: &DashboardSnapshot) -> Result<()> {
    let world = engine.world()?;
    let o = &snapshot.overview;
    let d = &snapshot.dividend;

    println!("=== WORLD ===");
    println!("  partners:       {}", world.partners.len());
    println!("  business:       {}", world.business.len());
    println!("  stores:         {}", world.stores.len());
    println!("  users:          {}", world.users.len());
    println!("  transactions:   {}", world.transactions.len());

    println!();
    println!("=== OVERVIEW ===");
    println!("  revenue:        {} ({})", o.revenue.value, o.revenue.trend);
    println!("  platform:       {} ({})", o.platform_revenue.value, o.platform_revenue.trend);
    println!("  active stores:  {} ({})", o.stores.value, o.stores.trend);
    println!("  active users:   {} ({})", o.users.value, o.users.trend);
    println!("  dividend pool:  {:.0} ({})", o.dividend_pool.value, o.dividend_pool.trend);

    println!();
    println!("=== DIVIDEND ROUND {} ({}%) ===", d.current_round, d.progress);
    for (role, share) in &d.current_distribution {
        println!("  {:<10} {:>10} ({:.0}%)", role.label(), share.amount, share.percentage);
    }

    println!();
    println!("=== TOP PARTNERS ===");
    for row in &snapshot.rankings.partners {
        println!("  {:>2}. {} | {} | {}", row.rank, row.name, row.label, row.amount);
    }
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    str_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::error::EngineError;

    fn engine() -> DashboardEngine {
        DashboardEngine::with_system_clock(EngineConfig::default_test()).unwrap()
    }

    fn replies(input: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        serve(&engine(), input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn bad_request_gets_error_line_and_loop_continues() {
        let lines = replies(concat!(
            "not json\n",
            "{\"type\":\"region_children\",\"parent_code\":\"sichuan\",\"level\":\"city\"}\n",
            "{\"type\":\"quit\"}\n",
            "{\"type\":\"reset\"}\n",
        ));
        assert_eq!(lines.len(), 2);
        assert!(lines[0]["error"].is_string());
        assert_eq!(lines[1].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn get_data_replies_with_snapshot() {
        let lines = replies("{\"type\":\"get_data\",\"filters\":{\"timeRange\":\"week\",\"round\":9}}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["dividend"]["currentRound"], 9);
    }

    #[test]
    fn engine_failure_becomes_error_reply() {
        let reply = error_reply(EngineError::LockPoisoned { what: "world" });
        let message = reply["error"].as_str().unwrap();
        assert!(message.contains("world"), "{message}");
    }
}
