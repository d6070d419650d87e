use anyhow::{Context, Result};
use clap::Parser;
use psychepedia::content::{Library, Locale};
use psychepedia::highlight::{DEFAULT_MARKER, Normalizer};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content_check")]
#[command(about = "Check article JSON files for unbalanced markup markers")]
struct Cli {
    content_dir: PathBuf,
    #[arg(short, long, default_value = DEFAULT_MARKER)]
    marker: String,
    #[arg(short, long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct ArticleReport {
    id: String,
    raw_chars: usize,
    canonical_chars: usize,
    markers: usize,
    balanced: bool,
}

fn check(library: &Library, normalizer: &Normalizer) -> Result<Vec<ArticleReport>> {
    let mut reports = Vec::new();
    for locale in [Locale::En, Locale::Ar] {
        for slug in library.slugs(locale)? {
            let article = library
                .load(locale, &slug)
                .with_context(|| format!("failed to load {}/{}", locale, slug))?;
            let markers = normalizer.count_markers(&article.body);
            reports.push(ArticleReport {
                raw_chars: article.body.chars().count(),
                canonical_chars: article.canonical(normalizer).chars().count(),
                markers,
                balanced: markers % 2 == 0,
                id: article.id,
            });
        }
    }
    Ok(reports)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let library = Library::new(Some(cli.content_dir.as_path()));
    let normalizer = Normalizer::new(&cli.marker);
    let reports = check(&library, &normalizer)?;

    for report in reports.iter().filter(|r| !r.balanced) {
        tracing::warn!(article_id = %report.id, markers = report.markers, "unbalanced markers");
    }

    let output = if cli.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{}", output);

    if reports.iter().any(|r| !r.balanced) {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_odd_marker_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(
            dir.path().join("en/ok.json"),
            r#"{"title": "Ok", "body": "**bold** text"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("en/odd.json"),
            r#"{"title": "Odd", "body": "**bold text"}"#,
        )
        .unwrap();

        let reports = check(&Library::new(Some(dir.path())), &Normalizer::default()).unwrap();
        assert_eq!(reports.len(), 2);
        let odd = reports.iter().find(|r| r.id == "en/odd").unwrap();
        assert!(!odd.balanced);
        assert_eq!(odd.canonical_chars, "bold text".len());
        let ok = reports.iter().find(|r| r.id == "en/ok").unwrap();
        assert!(ok.balanced);
        assert_eq!(ok.raw_chars - ok.canonical_chars, 4);
    }
}
