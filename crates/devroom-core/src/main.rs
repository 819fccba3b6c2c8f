use clap::{value_parser, Arg, Command};
use devroom_core::harness::{run_simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Command::new("devroom")
        .version(devroom_core::VERSION)
        .about("Devroom collaborative project rooms")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the scripted two-user session against the sim sandbox")
                .arg(
                    Arg::new("port")
                        .long("port")
                        .default_value("3000")
                        .value_parser(value_parser!(u16))
                        .help("Port the simulated server pretends to listen on"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let preview_port = *args.get_one::<u16>("port").unwrap();

            println!("Running devroom simulation...");
            println!("Preview port: {preview_port}");
            println!();

            let report = run_simulation(SimulationConfig { preview_port }).await;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
