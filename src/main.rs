use std::path::PathBuf;

use imaging_backend_core::api::server::serve;
use imaging_backend_core::config::resolve_service_config;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let (command, app_root) = parse_cli_args(cli_args.as_slice())?;
    match command {
        CliCommand::Help => print_usage(),
        CliCommand::PrintConfig => {
            let config = resolve_service_config(app_root.as_path())?;
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        }
        CliCommand::Serve => serve(resolve_service_config(app_root.as_path())?).await?,
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliCommand {
    Serve,
    PrintConfig,
    Help,
}

fn parse_cli_args(args: &[String]) -> Result<(CliCommand, PathBuf), Box<dyn std::error::Error>> {
    let mut command = CliCommand::Serve;
    let mut app_root = None::<PathBuf>;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => {
                command = CliCommand::Help;
                i += 1;
            }
            "print-config" if i == 0 => {
                command = CliCommand::PrintConfig;
                i += 1;
            }
            "--app-root" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
                };
                app_root = Some(PathBuf::from(value));
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }

    let app_root = match app_root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    Ok((command, app_root))
}

fn print_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  imaging-backend-core [--app-root PATH]\n",
        "  imaging-backend-core print-config [--app-root PATH]\n\n",
        "Configuration is read from the environment, then <app-root>/.env.\n",
        "  --app-root defaults to the current directory\n"
    ));
}
