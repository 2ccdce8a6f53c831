use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(long, value_enum, default_value = "all")]
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Apply pending migrations, then serve.
    All,
    /// Serve without touching the schema.
    Api,
    /// Apply pending migrations and exit.
    Migrate,
}

impl Mode {
    pub fn run_api(self) -> bool {
        matches!(self, Mode::All | Mode::Api)
    }

    pub fn run_migrations(self) -> bool {
        matches!(self, Mode::All | Mode::Migrate)
    }
}
