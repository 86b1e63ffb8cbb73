use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    catalog: Option<PathBuf>,
    silent: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = parse_args(std::env::args().skip(1).collect())?;
    encore::app::run(encore::app::AppOptions {
        catalog_path: args.catalog,
        silent: args.silent,
    })
}

// The TUI owns the terminal, so diagnostics go to a file instead of
// stderr. Logging stays off unless RUST_LOG is set.
fn init_logging() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        return Ok(());
    }
    let file = std::fs::File::create(std::env::temp_dir().join("encore.log"))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--silent" => out.silent = true,
            "--catalog" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--catalog requires a file path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--catalog cannot be empty");
                }
                out.catalog = Some(PathBuf::from(value.trim()));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Encore");
    println!("  --catalog path    Portfolio catalogue JSON file");
    println!("  --silent          Run without an audio device");
}
