//! `vncgw` entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match vncgw_cli::run(std::env::args().skip(1)).await {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("vncgw: {e}");
            exit_code(e.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
