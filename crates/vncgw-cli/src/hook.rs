//! Initialisation hook for applications served through the gateway.
//!
//! An application calls [`init`] first thing in `main` with its raw argument
//! list. With `-vnc.serve` the call runs the gateway, which re-launches the
//! same executable once per browser session; otherwise the application gets
//! its own arguments back plus the per-instance environment when it is one
//! of those sessions.

use tracing::debug;
use vncgw_core::{AppCommand, GatewayConfig, InstanceEnv};

use crate::error::CliError;
use crate::flags::parse_gateway_flags;
use crate::logging::init_logging;

/// What the application should do after [`init`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Init {
    /// The gateway ran (or help was printed) and has stopped; exit.
    Served,
    /// Run normally.
    Run {
        /// The original argument list, program name first, with gateway
        /// flags removed.
        args: Vec<String>,
        /// Set when this process was launched by the gateway.
        instance: Option<InstanceEnv>,
    },
}

/// Split gateway flags from `args` (program name first) and either serve or
/// hand the rest back.
pub async fn init<I>(args: I) -> Result<Init, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let program = args.next();

    let (flags, rest) = match parse_gateway_flags(args) {
        Err(e) if e.is_help() => {
            e.print()?;
            return Ok(Init::Served);
        }
        parsed => parsed?,
    };

    if !flags.serve {
        let instance = InstanceEnv::from_env();
        if let Some(env) = &instance {
            debug!(
                display = %env.display,
                width = env.viewport.width,
                height = env.viewport.height,
                mobile = env.mobile,
                "Running as gateway instance"
            );
        }
        return Ok(Init::Run {
            args: program.into_iter().chain(rest).collect(),
            instance,
        });
    }

    init_logging(flags.verbose);
    let exe = std::env::current_exe()?;
    let config = flags.apply(
        GatewayConfig::default()
            .with_app(AppCommand::new(exe, rest))
            .with_mobile_scale_from_env(),
    );
    vncgw_axum::start_server(config).await?;
    Ok(Init::Served)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_run_mode_strips_gateway_flags() {
        let init = init(args(&["demo", "-vnc.quality", "4", "-theme", "dark"]))
            .await
            .unwrap();
        let Init::Run { args: rest, .. } = init else {
            panic!("expected run mode");
        };
        assert_eq!(rest, args(&["demo", "-theme", "dark"]));
    }

    #[tokio::test]
    async fn test_bad_gateway_flag_is_argument_error() {
        let err = init(args(&["demo", "-vnc.nope"])).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_empty_args() {
        let init = init(Vec::new()).await.unwrap();
        assert!(matches!(init, Init::Run { ref args, .. } if args.is_empty()));
    }
}
