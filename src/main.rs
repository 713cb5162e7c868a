//! RAX FTP Client - Entry Point
//!
//! Connects to a server, logs in interactively and runs the command shell.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use tokio::io::{BufReader, stdin, stdout};

use rax_ftp_client::client::{ShellExit, login_interactive, run_shell};
use rax_ftp_client::error::handle_error;
use rax_ftp_client::{ClientConfig, Session};

#[derive(Parser, Debug)]
#[command(name = "rax-ftp-client", version, about = "Interactive FTP client")]
struct Cli {
    /// Server host name or IP address
    host: String,

    /// Control connection port
    port: Option<u16>,

    /// Local port for active mode listeners (0 = ephemeral)
    #[arg(long)]
    active_port: Option<u16>,

    /// Transfer rate limit in KiB/s (<= 0 for unlimited)
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<f64>,

    /// Configuration file
    #[arg(long)]
    config: Option<String>,

    /// User name, prompted for when omitted
    #[arg(long)]
    user: Option<String>,
}

fn load_config(cli: &Cli) -> Result<ClientConfig, config::ConfigError> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.startup.control_port = port;
    }
    if let Some(port) = cli.active_port {
        config.startup.active_port = port;
    }
    if let Some(limit) = cli.limit {
        config.runtime.rate_limit_kib = limit;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let (startup, runtime) = config.split();

    let (mut session, greeting) = match Session::connect(&cli.host, &startup, &runtime).await {
        Ok(connected) => connected,
        Err(e) => {
            handle_error(&e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("{}", greeting);

    let mut input = BufReader::new(stdin());
    let mut output = stdout();

    if let Err(e) = login_interactive(&mut session, cli.user.clone(), &mut input, &mut output).await
    {
        handle_error(&e);
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run_shell(&mut session, &mut input, &mut output).await {
        ShellExit::Quit => ExitCode::SUCCESS,
        ShellExit::EndOfInput => match session.quit().await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                handle_error(&e);
                ExitCode::FAILURE
            }
        },
        ShellExit::Closed(reason) => {
            info!("Session ended by server: {}", reason);
            ExitCode::FAILURE
        }
    }
}
