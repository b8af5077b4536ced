//! Build automation tasks for the ODIN ETL
//!
//! - Generating the CLI reference from the clap definitions

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the ODIN ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &Path) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<odin_etl::cli::Cli>();

    let content = format!(
        r#"# odin-etl CLI Reference

Generated from the CLI source code on {}.

## Overview

`odin-etl` loads the ODIN mobility survey (a sectioned metadata document and
a semicolon-separated fact table) into a PostgreSQL star schema: six
dimension tables and `fact_mobility`. Every table is merged by key, so
repeated runs converge on the same rows.

## Quick Start

```bash
# Validate the source files without touching the database
odin-etl check

# Load everything and print the run summary as JSON
odin-etl run --json
```

## Commands

{}

## Environment Variables

Source files:

- `DATA_DIR` - Directory holding the source files (default: `data`)
- `METADATA_FILE_NAME` - Sectioned metadata document (required)
- `DATA_FILE_NAME` - Fact table (required)
- `CSV_SEPARATOR` - Field separator (default: `;`)

Database (required for `run`):

- `USERNAME`, `PASSWORD`, `DATABASE` - Connection credentials
- `SCHEMA` - Target schema; empty for unqualified table names
- `HOST` - Database host (default: `localhost`)
- `PORT` - Database port (default: `5432`)
- `DB_MAX_CONNECTIONS` - Pool size (default: `2`)
- `DB_CONNECT_TIMEOUT` - Connect timeout in seconds (default: `30`)

A numeric variable that does not parse is a configuration error.

Logging:

- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`
- `LOG_FILTER` or `RUST_LOG` - Filter directives (e.g. `odin_etl=debug,sqlx=warn`)
- `LOG_CONSOLE_STREAM` - `stderr` (default) or `stdout`; stdout is reserved for `run --json`

## Exit Status

- `0` - Run or check completed
- `1` - A stage failed; the log names the stage and the cause
- `130` - Interrupted; nothing is written before loading starts, and during load the
  table being written is rolled back while tables committed earlier are kept

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let file_path = output_dir.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_cli_docs_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("docs");

        generate_cli_docs(&output_dir).unwrap();

        let content = fs::read_to_string(output_dir.join("cli-reference.md")).unwrap();
        assert!(content.starts_with("# odin-etl CLI Reference"));
        assert!(content.contains("LOG_CONSOLE_STREAM"));
        assert!(content.contains("`130`"));
    }
}
