//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, TimeZone};
use chrono_tz::Tz;

use crate::config::SiteConfig;
use crate::error::{BlogError, Result};

const PT_BR_MONTHS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Display locale for dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    PtBr,
    En,
}

impl Locale {
    /// Resolve a language tag such as `pt-BR` or `en_US`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Some(Self::PtBr),
            "en" | "en-us" | "en-gb" => Some(Self::En),
            _ => None,
        }
    }

    /// Abbreviated month name, `month0` in `0..12`
    pub fn month_abbrev(&self, month0: u32) -> &'static str {
        let months = match self {
            Self::PtBr => &PT_BR_MONTHS,
            Self::En => &EN_MONTHS,
        };
        months[month0 as usize % 12]
    }
}

/// Parse a CMS timestamp.
///
/// Accepts RFC 3339 as well as the `+0000` offset form the content API emits
/// (`2021-03-25T19:25:28+0000`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Renders publication dates as `dd MMM yyyy` in a fixed locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    tz: Tz,
    placeholder: String,
}

impl DateFormatter {
    pub fn new(locale: Locale, tz: Tz, placeholder: &str) -> Self {
        Self {
            locale,
            tz,
            placeholder: placeholder.to_string(),
        }
    }

    /// Build the formatter described by the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Ok(Self::new(
            config.locale()?,
            config.tz()?,
            &config.labels.missing_date,
        ))
    }

    /// Format a parsed timestamp, e.g. "19 Abr 2021"
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        let local = date.with_timezone(&self.tz);
        format!(
            "{:02} {} {:04}",
            local.day(),
            self.locale.month_abbrev(local.month0()),
            local.year()
        )
    }

    /// Format an optional timestamp, using the placeholder when absent
    pub fn format_optional(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        match date {
            Some(date) => self.format(date),
            None => self.placeholder.clone(),
        }
    }

    /// Parse and format a raw timestamp string
    pub fn format_raw(&self, raw: Option<&str>) -> Result<String> {
        match raw {
            Some(raw) => parse_timestamp(raw)
                .map(|date| self.format(&date))
                .ok_or_else(|| BlogError::malformed(format!("invalid timestamp '{}'", raw))),
            None => Ok(self.placeholder.clone()),
        }
    }

    /// The string shown for posts without a publication date
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }
}
