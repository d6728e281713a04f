//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "fruit-headless")]
#[command(about = "Play a fruit-merge session without a display and print a JSON summary")]
pub struct Args {
    /// JSON game configuration
    #[arg(long, env = "FRUIT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Override the configured RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,
    /// Ticks between automatic drops
    #[arg(long, default_value_t = 45, value_parser = clap::value_parser!(u32).range(1..))]
    pub drop_every: u32,
    /// Keep ticking (no-ops) after game over until the tick limit or Ctrl-C
    #[arg(long)]
    pub keep_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("fruit-headless").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.drop_every, 45);
        assert!(args.seed.is_none() && args.ticks.is_none());
        assert!(!args.keep_running);
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "--config", "game.json", "--seed", "9", "--ticks", "600", "--drop-every", "10",
            "--keep-running",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("game.json")));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.ticks, Some(600));
        assert_eq!(args.drop_every, 10);
        assert!(args.keep_running);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--seed"]).is_err());
        assert!(parse(&["--seed", "abc"]).is_err());
        assert!(parse(&["--drop-every", "0"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_command_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
