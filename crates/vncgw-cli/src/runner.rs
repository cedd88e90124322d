//! The standalone `vncgw` command: `vncgw [-vnc.* flags] <program> [args...]`.

use tracing::info;
use vncgw_core::{AppCommand, GatewayConfig};

use crate::error::CliError;
use crate::flags::parse_gateway_flags;
use crate::logging::init_logging;

const USAGE: &str = "usage: vncgw [-vnc.* flags] <program> [args...] (see -vnc.help)";

/// Run the command and return the process exit code.
///
/// With `-vnc.serve` the program is served through the gateway until ctrl-c;
/// otherwise it runs directly on the current display.
pub async fn run<I>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = String>,
{
    let (flags, rest) = match parse_gateway_flags(args) {
        Err(e) if e.is_help() => {
            e.print()?;
            return Ok(0);
        }
        parsed => parsed?,
    };
    init_logging(flags.verbose);

    let mut rest = rest.into_iter();
    let Some(program) = rest.next() else {
        return Err(CliError::Arguments(USAGE.to_string()));
    };
    let app = AppCommand::new(program, rest.collect());

    if flags.serve {
        let config = flags.apply(
            GatewayConfig::default()
                .with_app(app)
                .with_mobile_scale_from_env(),
        );
        vncgw_axum::start_server(config).await?;
        return Ok(0);
    }

    run_direct(&app).await
}

async fn run_direct(app: &AppCommand) -> Result<i32, CliError> {
    info!(program = %app.program.display(), "Running application directly");
    let status = tokio::process::Command::new(&app.program)
        .args(&app.args)
        .status()
        .await
        .map_err(|e| CliError::Process(format!("failed to start {}: {e}", app.program.display())))?;
    Ok(status.code().unwrap_or(1))
}
