use clap::Parser;
use psychepedia::app::{Commit, Reader};
use psychepedia::config::{Cli, Command, Config, default_config_path};
use psychepedia::content::Library;
use psychepedia::kv::FileStore;
use psychepedia::unpack_error;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // An explicit --config must exist; the default location is optional.
    let cfg = match &args.config_path {
        Some(path) => Config::new(path),
        None => Config::new_or_default(&default_config_path()),
    }
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?args.config_path, "failed to load config file");
        std::process::exit(1);
    });

    let data_dir = cfg.app.get_data_dir();
    let kv = FileStore::new(&data_dir).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), path = ?data_dir, "failed to open highlight store");
        std::process::exit(1);
    });
    let library = Library::new(cfg.app.get_content_dir());
    let mut reader = Reader::new(&cfg, library, kv);

    if let Err(e) = run(&mut reader, args.command) {
        tracing::error!(error = %format!("{:#}", e), "command failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(reader: &mut Reader<FileStore>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show { locale, slug, html } => {
            let article = reader.show(locale, &slug)?;
            if html {
                println!("{}", article.to_html());
            } else {
                println!("{}", article.to_text());
            }
        }
        Command::Highlight {
            locale,
            slug,
            fragment,
            tag,
        } => match reader.highlight(locale, &slug, &fragment, tag)? {
            Commit::Saved(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Commit::Rejected(msg) => {
                eprintln!("{}", msg);
                std::process::exit(2);
            }
        },
        Command::List { locale, slug } => {
            let records = reader.list(locale, &slug)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Remove { locale, slug, id } => {
            if reader.remove(locale, &slug, &id)? {
                println!("removed {}", id);
            } else {
                println!("no highlight {}", id);
            }
        }
        Command::Clear { locale, slug } => {
            reader.clear(locale, &slug)?;
            println!("cleared {}/{}", locale, slug);
        }
        Command::Mode { action } => {
            let enabled = reader.mode(action)?;
            println!(
                "{} ({})",
                if enabled { "on" } else { "off" },
                reader.session().toggle_label()
            );
        }
    }
    Ok(())
}
