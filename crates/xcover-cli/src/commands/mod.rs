pub mod start;
pub mod status;
pub mod stop;
pub mod wait;

use crate::cli::{Cli, Command};
use crate::settings::Settings;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let settings = Settings::load();
    match cli.cmd {
        Command::Start(args) | Command::Run(args) | Command::Profile(args) => {
            start::run(&settings, args, false).await
        }
        Command::Foreground(args) => start::run(&settings, args, true).await,
        Command::Wait(args) => wait::run(&settings, args).await,
        Command::Status(_) => status::run(&settings),
        Command::Stop(args) => stop::run(&settings, *args.grace_period),
    }
}
