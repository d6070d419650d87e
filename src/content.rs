use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_embed::Embed;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;
use crate::highlight::Normalizer;

#[derive(Embed)]
#[folder = "content"]
struct EmbeddedContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Ar,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    pub fn direction(&self) -> &'static str {
        match self {
            Locale::En => "ltr",
            Locale::Ar => "rtl",
        }
    }
}

impl FromStr for Locale {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ar" => Ok(Locale::Ar),
            other => Err(ContentError::UnknownLocale(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ArticleFile {
    title: String,
    body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: String,
    pub locale: Locale,
    pub slug: String,
    pub title: String,
    pub body: String,
}

impl Article {
    pub fn article_id(locale: Locale, slug: &str) -> String {
        format!("{}/{}", locale, slug)
    }

    pub fn canonical(&self, normalizer: &Normalizer) -> String {
        normalizer.normalize(&self.body)
    }
}

/// Where article JSON comes from: a directory laid out as
/// `{locale}/{slug}.json`, or the copy of `content/` built into the binary.
#[derive(Debug, Clone)]
pub enum Library {
    Directory(PathBuf),
    Embedded,
}

impl Library {
    pub fn new(content_dir: Option<&Path>) -> Self {
        match content_dir {
            Some(dir) => Library::Directory(dir.to_path_buf()),
            None => Library::Embedded,
        }
    }

    pub fn load(&self, locale: Locale, slug: &str) -> Result<Article, ContentError> {
        let id = Article::article_id(locale, slug);
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.starts_with('.') {
            return Err(ContentError::ArticleNotFound(id));
        }

        let relative = format!("{}/{}.json", locale, slug);
        let raw = match self {
            Library::Directory(dir) => {
                let path = dir.join(&relative);
                match fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(ContentError::ArticleNotFound(id));
                    }
                    Err(source) => {
                        return Err(ContentError::Io {
                            path: path.display().to_string(),
                            source,
                        });
                    }
                }
            }
            Library::Embedded => match EmbeddedContent::get(&relative) {
                Some(file) => file.data.into_owned(),
                None => return Err(ContentError::ArticleNotFound(id)),
            },
        };

        let file: ArticleFile =
            serde_json::from_slice(&raw).map_err(|source| ContentError::Parse {
                path: relative.clone(),
                source,
            })?;

        tracing::debug!(article_id = %id, "loaded article");
        Ok(Article {
            id,
            locale,
            slug: slug.to_string(),
            title: file.title,
            body: file.body,
        })
    }

    /// Slugs available for `locale`, sorted.
    pub fn slugs(&self, locale: Locale) -> Result<Vec<String>, ContentError> {
        let mut slugs: Vec<String> = match self {
            Library::Directory(dir) => {
                let locale_dir = dir.join(locale.as_str());
                let entries = match fs::read_dir(&locale_dir) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                    Err(source) => {
                        return Err(ContentError::Io {
                            path: locale_dir.display().to_string(),
                            source,
                        });
                    }
                };
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let name = entry.file_name().to_string_lossy().into_owned();
                        name.strip_suffix(".json").map(str::to_string)
                    })
                    .collect()
            }
            Library::Embedded => {
                let prefix = format!("{}/", locale);
                EmbeddedContent::iter()
                    .filter_map(|path| {
                        path.strip_prefix(prefix.as_str())
                            .and_then(|rest| rest.strip_suffix(".json"))
                            .map(str::to_string)
                    })
                    .collect()
            }
        };
        slugs.sort();
        Ok(slugs)
    }
}
