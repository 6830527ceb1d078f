use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A scraped news article as produced by the scraper.
///
/// Keys follow the scraper's JSON. Missing and `null` fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "Titulo", default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(rename = "Descripcion", default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(rename = "Autor", default, deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(rename = "Fuente", default, deserialize_with = "null_as_empty")]
    pub source: String,
    #[serde(rename = "Fecha", default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(rename = "Link", default, deserialize_with = "null_as_empty")]
    pub link: String,
    #[serde(rename = "Cuerpo", default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(rename = "Fuente_base", default, deserialize_with = "null_as_empty")]
    pub source_site: String,
    #[serde(rename = "Extraido_en", default, deserialize_with = "null_as_empty")]
    pub extracted_at: String,
}

impl Article {
    /// Title, description and body joined by blank lines, skipping empty parts.
    pub fn digest(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.title, &self.description, &self.body]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The closed set of government ministries an article can be tagged with.
///
/// The wire labels are the exact strings the model is asked to answer with;
/// matching is case and accent sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ministry {
    #[serde(rename = "Salud")]
    Health,
    #[serde(rename = "Educación")]
    Education,
    #[serde(rename = "Seguridad")]
    Security,
    #[serde(rename = "Trabajo")]
    Labor,
    #[serde(rename = "Economía")]
    Economy,
}

impl Ministry {
    pub const ALL: [Ministry; 5] = [
        Ministry::Health,
        Ministry::Education,
        Ministry::Security,
        Ministry::Labor,
        Ministry::Economy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Ministry::Health => "Salud",
            Ministry::Education => "Educación",
            Ministry::Security => "Seguridad",
            Ministry::Labor => "Trabajo",
            Ministry::Economy => "Economía",
        }
    }

    /// Exact membership test against the wire labels.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

impl fmt::Display for Ministry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Ministry {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|m| m.label()).collect();
            format!("unknown ministry '{}', expected one of: {}", s, valid.join(", "))
        })
    }
}

/// One verdict from the model: the article position it echoed back and its labels.
///
/// `idx` is signed because it is whatever the model wrote; it may point nowhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub idx: i64,
    #[serde(rename = "ministerio")]
    pub ministries: Vec<Ministry>,
}

/// An input article plus the labels found for it; empty when none were.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(rename = "ministerio", default)]
    pub ministries: Vec<Ministry>,
}

impl ClassifiedArticle {
    pub fn has(&self, ministry: Ministry) -> bool {
        self.ministries.contains(&ministry)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinistrySummary {
    #[serde(rename = "ministerio")]
    pub ministry: Ministry,
    pub total: usize,
    #[serde(rename = "resumen")]
    pub summary: String,
    #[serde(rename = "generado_en")]
    pub generated_at: DateTime<Utc>,
}
