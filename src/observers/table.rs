//! Table observer for pretty-printing per-type counters.
//!
//! This module provides [`TableObserver`], which renders a collection of
//! [`TypeCensus`] entries as a formatted ASCII table using the `tabled` crate.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! istanze = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use istanze::census::Census;
//! use istanze::observers::table::{TableObserver, TableStyle};
//!
//! let census = Census::new().track::<Request>().track_extended::<Session>();
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render(census.collect().iter()));
//! // ╭─────────┬─────────┬───────┬───────────┬──────────────┬───────────┬─────────────┬───────────┬─────────────╮
//! // │ Type    │ Created │ Alive │ Destroyed │ Inconsistent │ Copy ctor │ Copy assign │ Move ctor │ Move assign │
//! // ├─────────┼─────────┼───────┼───────────┼──────────────┼───────────┼─────────────┼───────────┼─────────────┤
//! // │ Request │ 1000    │ 8     │ 992       │ no           │ -         │ -           │ -         │ -           │
//! // │ Session │ 12      │ 3     │ 9         │ no           │ 4         │ 0           │ 2         │ 1           │
//! // ╰─────────┴─────────┴───────┴───────────┴──────────────┴───────────┴─────────────┴───────────┴─────────────╯
//! ```

use crate::census::TypeCensus;
use crate::counters::TransferStatus;
use tabled::{settings::Style, Table, Tabled};

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row.
    pub show_header: bool,
    /// Custom title for the table (optional).
    pub title: Option<String>,
    /// Placeholder for the copy/move columns of types that do not expose them.
    pub missing: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
            missing: "-".to_string(),
        }
    }
}

/// Internal row representation for tabled.
#[derive(Tabled)]
struct CensusRow {
    #[tabled(rename = "Type")]
    name: String,
    #[tabled(rename = "Created")]
    created: u64,
    #[tabled(rename = "Alive")]
    alive: u64,
    #[tabled(rename = "Destroyed")]
    destroyed: u64,
    #[tabled(rename = "Inconsistent")]
    inconsistent: &'static str,
    #[tabled(rename = "Copy ctor")]
    copy_constructions: String,
    #[tabled(rename = "Copy assign")]
    copy_assignments: String,
    #[tabled(rename = "Move ctor")]
    move_constructions: String,
    #[tabled(rename = "Move assign")]
    move_assignments: String,
}

/// An observer that renders per-type counters as a formatted table.
///
/// One row per type. The `Inconsistent` column reports the sticky
/// `too_many_destructions` flag; the copy/move columns show the configured
/// placeholder for types tracked without their transfer counters.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets an optional title for the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Sets the placeholder used for missing copy/move counters.
    pub fn with_missing(mut self, placeholder: impl Into<String>) -> Self {
        self.config.missing = placeholder.into();
        self
    }

    /// Applies the configured style to a table.
    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    fn row(&self, entry: &TypeCensus) -> CensusRow {
        let transfer = |pick: fn(&TransferStatus<u64>) -> u64| {
            entry
                .transfers
                .as_ref()
                .map_or_else(|| self.config.missing.clone(), |t| pick(t).to_string())
        };

        CensusRow {
            name: entry.type_name.to_string(),
            created: entry.status.created,
            alive: entry.status.alive,
            destroyed: entry.status.destroyed,
            inconsistent: if entry.status.too_many_destructions {
                "yes"
            } else {
                "no"
            },
            copy_constructions: transfer(|t| t.copy_constructions),
            copy_assignments: transfer(|t| t.copy_assignments),
            move_constructions: transfer(|t| t.move_constructions),
            move_assignments: transfer(|t| t.move_assignments),
        }
    }

    /// Renders the entries as a formatted table string.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use istanze::observers::table::TableObserver;
    ///
    /// let entries = census.collect();
    /// let table = TableObserver::new().with_title("Objects").render(entries.iter());
    /// ```
    pub fn render<'a>(&self, entries: impl Iterator<Item = &'a TypeCensus>) -> String {
        let rows: Vec<CensusRow> = entries.map(|entry| self.row(entry)).collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        if let Some(ref title) = self.config.title {
            format!("{}\n{}", title, table)
        } else {
            table.to_string()
        }
    }
}
