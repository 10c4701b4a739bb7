use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "heat",
    about = "heatgrid — server heat classification and routing freeze",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single hit value (0-100) without any memory.
    Classify {
        /// Hit value. Out-of-range values are clamped.
        #[arg(allow_negative_numbers = true)]
        hit: i32,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Replay a sequence of readings through fresh per-server memory.
    ///
    /// Each step is `<server-id>:<hit>`, e.g. `rack-a:72 rack-b:40 rack-a:91`.
    /// The routing target after every step is printed alongside the decision.
    Replay {
        /// Readings in order.
        #[arg(required = true)]
        steps: Vec<String>,
        /// Load at or above which a server is frozen.
        #[arg(long, default_value = "90")]
        freeze: i32,
        /// Load at or below which a frozen server is released.
        #[arg(long, default_value = "70")]
        release: i32,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("heat=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { hit, format } => commands::classify::classify(hit, &format),
        Commands::Replay {
            steps,
            freeze,
            release,
            format,
        } => commands::replay::replay(&steps, freeze, release, &format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn replay_flags_after_steps_are_parsed_as_flags() {
        let cli = Cli::try_parse_from([
            "heat", "replay", "a:95", "b:40", "--format", "json", "--freeze", "85",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay {
                steps,
                freeze,
                release,
                format,
            } => {
                assert_eq!(steps, vec!["a:95", "b:40"]);
                assert_eq!(freeze, 85);
                assert_eq!(release, 70);
                assert_eq!(format, "json");
            }
            Commands::Classify { .. } => panic!("expected replay"),
        }
    }

    #[test]
    fn replay_step_with_negative_hit_is_a_value() {
        let cli = Cli::try_parse_from(["heat", "replay", "rack-a:-5"]).unwrap();
        match cli.command {
            Commands::Replay { steps, .. } => assert_eq!(steps, vec!["rack-a:-5"]),
            Commands::Classify { .. } => panic!("expected replay"),
        }
    }

    #[test]
    fn release_help_matches_inclusive_threshold() {
        let cmd = Cli::command();
        let replay = cmd.find_subcommand("replay").unwrap();
        let release = replay
            .get_arguments()
            .find(|arg| arg.get_id() == "release")
            .unwrap();
        assert!(release.get_help().unwrap().to_string().contains("at or below"));
    }

    #[test]
    fn classify_accepts_negative_hit() {
        let cli = Cli::try_parse_from(["heat", "classify", "-5", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Classify { hit, format } => {
                assert_eq!(hit, -5);
                assert_eq!(format, "json");
            }
            Commands::Replay { .. } => panic!("expected classify"),
        }
    }
}
