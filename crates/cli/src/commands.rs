use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline once
    Run {
        #[arg(short, long, help = "Pipeline definition file")]
        config: PathBuf,

        #[arg(
            short,
            long,
            help = "Ignore the stored cursor and extract from the initial value. The new cursor is still saved after a successful load"
        )]
        full_refresh: bool,
    },
    /// List every registered source, transform, sink and schema
    List,
    /// Check a pipeline definition and the plugin keys it references without running it
    Validate {
        #[arg(short, long, help = "Pipeline definition file")]
        config: PathBuf,
    },
}
