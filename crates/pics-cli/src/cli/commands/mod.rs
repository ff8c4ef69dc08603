use super::args::*;

pub mod config;
pub mod eval;
pub mod filter;

use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Filter(args) => filter::run(args).await,
        Command::Eval(args) => eval::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
