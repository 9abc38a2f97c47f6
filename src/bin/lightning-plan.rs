use clap::{Arg, ArgMatches, Command};
use lightning_planner::logging::init_logging;
use lightning_planner::plan::render;
use lightning_planner::{PhysicalOperator, PhysicalPlanner, PlannerConfig};
use std::fs;
use tracing::Level;

/// Lightning planner CLI
///
/// Costs and lowers physical operator trees stored as JSON:
/// - `cost` prints the self cost and cumulative cost of the root operator
/// - `lower` prints the executable plan as an indented tree or JSON
/// - `explain` prints the operator tree itself

fn main() {
    let matches = create_cli().get_matches();

    if let Err(e) = run_command(matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    Command::new("lightning-plan")
        .about("Lightning physical plan compiler")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("config")
            .help("Planner configuration file (JSON)")
            .long("config")
            .global(true))
        .arg(Arg::new("log-level")
            .help("Log level")
            .long("log-level")
            .value_parser(["error", "warn", "info", "debug", "trace"])
            .default_value("warn")
            .global(true))
        .arg(Arg::new("json-logs")
            .help("Emit logs as JSON")
            .long("json-logs")
            .action(clap::ArgAction::SetTrue)
            .global(true))
        .subcommand(
            Command::new("cost")
                .about("Estimate the cost of an operator tree")
                .arg(Arg::new("operator")
                    .help("Operator tree file (JSON)")
                    .required(true)
                    .index(1))
        )
        .subcommand(
            Command::new("lower")
                .about("Lower an operator tree to an executable plan")
                .arg(Arg::new("operator")
                    .help("Operator tree file (JSON)")
                    .required(true)
                    .index(1))
                .arg(Arg::new("format")
                    .help("Output format")
                    .long("format")
                    .value_parser(["text", "json"])
                    .default_value("text"))
        )
        .subcommand(
            Command::new("explain")
                .about("Describe an operator tree")
                .arg(Arg::new("operator")
                    .help("Operator tree file (JSON)")
                    .required(true)
                    .index(1))
        )
}

fn run_command(matches: ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let level = match matches.get_one::<String>("log-level").map(String::as_str) {
        Some("error") => Level::ERROR,
        Some("info") => Level::INFO,
        Some("debug") => Level::DEBUG,
        Some("trace") => Level::TRACE,
        _ => Level::WARN,
    };
    init_logging(level, matches.get_flag("json-logs"));

    let config = match matches.get_one::<String>("config") {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    }
    .with_env_overrides()?;
    let planner = PhysicalPlanner::new(config)?;

    match matches.subcommand() {
        Some(("cost", sub_matches)) => cmd_cost(&planner, sub_matches),
        Some(("lower", sub_matches)) => cmd_lower(&planner, sub_matches),
        Some(("explain", sub_matches)) => cmd_explain(sub_matches),
        _ => unreachable!(),
    }
}

fn load_operator(matches: &ArgMatches) -> Result<PhysicalOperator, Box<dyn std::error::Error>> {
    let path = matches
        .get_one::<String>("operator")
        .ok_or("missing operator file")?;
    let json = fs::read_to_string(path)?;
    Ok(PhysicalOperator::from_json(&json)?)
}

fn cmd_cost(planner: &PhysicalPlanner, matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let op = load_operator(matches)?;
    let own = planner.self_cost(&op);
    let total = planner.cumulative_cost(&op);

    println!("Operator:        {}", op.name());
    println!("Estimated rows:  {:.2}", own.rows());
    println!("Self cost:       {}", own);
    println!("Cumulative cost: {}", total);
    Ok(())
}

fn cmd_lower(planner: &PhysicalPlanner, matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let op = load_operator(matches)?;
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");

    let plan = planner.compile(&op)?;
    match format {
        "json" => println!("{}", plan.root.to_json()?),
        _ => {
            println!("Strategy: {:?}", plan.strategy);
            println!("Cost:     {}", plan.cost);
            print!("{}", render(&plan.root));
        }
    }
    Ok(())
}

fn cmd_explain(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let op = load_operator(matches)?;
    print!("{}", op.explain_tree());
    Ok(())
}
