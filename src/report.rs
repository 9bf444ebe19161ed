use crate::error::FetchError;
use crate::utils;
use console::style;
use once_cell::sync::Lazy;
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator, TableFormat};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

/// Value used for audit fields that are absent or already passing.
pub const NOT_APPLICABLE: &str = "NA";

// (audit id, passing title) of the audits reported in [`Scores`].
pub const CONTRAST_AUDIT: (&str, &str) = (
    "color-contrast",
    "Background and foreground colors have a sufficient contrast ratio",
);
pub const FONT_SIZE_AUDIT: (&str, &str) = ("font-size", "Document uses legible font sizes");
pub const LINK_TEXT_AUDIT: (&str, &str) = ("link-text", "Links have descriptive text");

static TABLE_FORMAT: Lazy<TableFormat> = Lazy::new(|| {
    FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(&[LinePosition::Top], LineSeparator::new('─', '┬', '┌', '┐'))
        .separators(&[LinePosition::Title], LineSeparator::new('─', '┼', '├', '┤'))
        .separators(
            &[LinePosition::Bottom],
            LineSeparator::new('─', '┴', '└', '┘'),
        )
        .padding(1, 1)
        .build()
});

// region: Remote response

/// The parts of a PageSpeed Insights response this tool reads.
///
/// Every level is optional because the document is controlled by the remote
/// service; presence is checked in [`ScoreRecord::from_response`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedResponse {
    pub lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LighthouseResult {
    pub categories: Option<HashMap<String, Category>>,
    pub audits: Option<HashMap<String, Audit>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Category {
    pub score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Audit {
    pub title: Option<String>,
}
// endregion

// region: Score records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "Performance", serialize_with = "serialize_score")]
    pub performance: f64,
    #[serde(rename = "Accessibility", serialize_with = "serialize_score")]
    pub accessibility: f64,
    #[serde(rename = "BestPractices", serialize_with = "serialize_score")]
    pub best_practices: f64,
    #[serde(rename = "SEO", serialize_with = "serialize_score")]
    pub seo: f64,
    #[serde(rename = "Contrast")]
    pub contrast: String,
    #[serde(rename = "User_Experience")]
    pub user_experience: String,
    #[serde(rename = "Mobile_Friendly")]
    pub mobile_friendly: String,
}

/// Writes whole scores as integers (`90`, not `90.0`).
fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*score as i64)
    } else {
        serializer.serialize_f64(*score)
    }
}

/// The normalized result of one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub url: String,
    pub scores: Scores,
}

impl ScoreRecord {
    /// Extracts the four category scores and three audit titles from a response.
    ///
    /// Fails with [`FetchError::MalformedResponse`] if `lighthouseResult`,
    /// its `categories` or its `audits` are missing, and with
    /// [`FetchError::MissingCategory`] if one of the four categories is absent.
    /// A category that is present with a `null` score scores 0.
    pub fn from_response(url: &str, response: &PageSpeedResponse) -> Result<Self, FetchError> {
        let result = response
            .lighthouse_result
            .as_ref()
            .ok_or(FetchError::MalformedResponse)?;
        let (Some(categories), Some(audits)) = (&result.categories, &result.audits) else {
            return Err(FetchError::MalformedResponse);
        };

        let score = |name: &'static str| -> Result<f64, FetchError> {
            let category = categories
                .get(name)
                .ok_or(FetchError::MissingCategory(name))?;
            // Lighthouse reports `null` for a category that errored while running.
            Ok(category.score.unwrap_or(0.0) * 100.0)
        };

        Ok(ScoreRecord {
            url: url.to_string(),
            scores: Scores {
                performance: score("performance")?,
                accessibility: score("accessibility")?,
                best_practices: score("best-practices")?,
                seo: score("seo")?,
                contrast: audit_title(audits, CONTRAST_AUDIT),
                user_experience: audit_title(audits, FONT_SIZE_AUDIT),
                mobile_friendly: audit_title(audits, LINK_TEXT_AUDIT),
            },
        })
    }
}

/// Resolves an audit to its title, or [`NOT_APPLICABLE`] when the audit is
/// missing, has an empty or no title, or carries the passing message.
pub fn audit_title(audits: &HashMap<String, Audit>, (id, passing): (&str, &str)) -> String {
    match audits.get(id).and_then(|audit| audit.title.as_deref()) {
        Some(title) if !title.is_empty() && title != passing => title.to_string(),
        _ => NOT_APPLICABLE.to_string(),
    }
}
// endregion

// region: Outcomes & report

/// Result of one fetch attempt for one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ScoreRecord),
    Failure(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub url: String,
    pub error: String,
}

#[derive(Debug)]
pub struct Report {
    pub urls_submitted: usize,
    pub urls_valid: usize,
    pub concurrency_limit: u8,
    pub total_time: Duration,
    /// Successful records in completion order.
    pub records: Vec<ScoreRecord>,
    pub failures: Vec<Failure>,
    /// Tasks that ended without producing an outcome (panicked or were cancelled).
    pub rejected: usize,
}

impl Report {
    pub fn new(urls_submitted: usize, urls_valid: usize, concurrency_limit: u8) -> Self {
        Report {
            urls_submitted,
            urls_valid,
            concurrency_limit,
            total_time: Duration::ZERO,
            records: Vec::new(),
            failures: Vec::new(),
            rejected: 0,
        }
    }

    /// Files an outcome. Failures are kept only for the summary; they never
    /// reach the aggregate JSON.
    pub fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(record) => self.records.push(record),
            Outcome::Failure(failure) => self.failures.push(failure),
        }
    }

    /// Returns the aggregate records as a pretty-printed JSON array.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    pub fn write_json_report(&self, report_path: &Path, quiet: bool) -> Result<(), Box<dyn Error>> {
        // If the report path parent is a directory, create it if it doesn't exist yet
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(report_path)?;
        file.write_all(self.to_json_string()?.as_bytes())?;

        let confirmation = format!(
            "\n📄 Lighthouse reports written to {}",
            style(report_path.display()).underlined().cyan()
        );
        if quiet {
            eprintln!("{confirmation}");
        } else {
            println!("{confirmation}");
        }

        Ok(())
    }

    pub fn show_text_report(&self) {
        println!("\n{}", style("📋 Summary").bold().underlined());
        println!("{}", self.build_summary_table());

        if !self.records.is_empty() {
            println!("{}", style("🚦 Scores").bold().underlined());
            println!("{}", self.build_scores_table());
        }

        if !self.failures.is_empty() {
            println!("{}", style("❌ Failed URLs").bold().underlined());
            for failure in &self.failures {
                println!(
                    "  {} {}",
                    style(utils::truncate_message(&failure.url, 60)).red(),
                    style(&failure.error).dim()
                );
            }
        }
    }

    /// Run counters as a two-column label/value table.
    fn build_summary_table(&self) -> String {
        let rows = [
            ("Concurrency Limit", self.concurrency_limit.to_string()),
            ("Elapsed Time", format!("{:.2?}", self.total_time)),
            ("URLs Submitted", self.urls_submitted.to_string()),
            ("Valid URLs", self.urls_valid.to_string()),
            ("Reports Collected", self.records.len().to_string()),
            (
                "Failed Fetches",
                (self.failures.len() + self.rejected).to_string(),
            ),
        ];

        let mut table = Table::new();
        table.set_format(*TABLE_FORMAT);
        for (label, value) in rows {
            table.add_row(Row::new(vec![Cell::new(label), Cell::new(&value)]));
        }
        table.to_string()
    }

    fn build_scores_table(&self) -> String {
        let mut table = Table::new();
        table.set_format(*TABLE_FORMAT);
        table.set_titles(Row::new(
            [
                "URL",
                "Perf",
                "A11y",
                "BP",
                "SEO",
                "Contrast",
                "User Experience",
                "Mobile Friendly",
            ]
            .iter()
            .map(|title| Cell::new(title).style_spec("b"))
            .collect(),
        ));

        for record in &self.records {
            let scores = &record.scores;
            table.add_row(Row::new(vec![
                Cell::new(&utils::truncate_message(&record.url, 50)),
                Cell::new(&utils::score(scores.performance)).style_spec("r"),
                Cell::new(&utils::score(scores.accessibility)).style_spec("r"),
                Cell::new(&utils::score(scores.best_practices)).style_spec("r"),
                Cell::new(&utils::score(scores.seo)).style_spec("r"),
                Cell::new(&utils::truncate_message(&scores.contrast, 30)),
                Cell::new(&utils::truncate_message(&scores.user_experience, 30)),
                Cell::new(&utils::truncate_message(&scores.mobile_friendly, 30)),
            ]));
        }
        table.to_string()
    }

    /// Determines the process exit code.
    ///
    /// - `0` — Every valid URL produced a record.
    /// - `1` — At least one fetch failed.
    pub fn exit_code(&self) -> ExitCode {
        if self.failures.is_empty() && self.rejected == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        }
    }
}
// endregion
