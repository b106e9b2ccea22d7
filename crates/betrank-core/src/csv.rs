//! Site import/export in the admin CSV layout.
//!
//! Header: `name,url,description,categories,commission,ltv`, where
//! `categories` is `|`-joined. Records are single-line; quoted fields may
//! contain commas and doubled quotes.

use thiserror::Error;

pub const HEADERS: [&str; 6] = ["name", "url", "description", "categories", "commission", "ltv"];
pub const REQUIRED_HEADERS: [&str; 2] = ["name", "url"];

/// Joins the `categories` column.
pub const CATEGORY_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvError {
    #[error("CSV file is empty")]
    Empty,

    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
}

/// A site as it appears in one CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub name: String,
    pub url: String,
    pub description: String,
    pub categories: Vec<String>,
    pub commission: Option<f64>,
    pub ltv: Option<f64>,
}

/// Result of parsing an import file. Bad rows are reported, not fatal.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedSites {
    /// `(line number, record)`, line numbers 1-based with the header at 1.
    pub records: Vec<(usize, SiteRecord)>,
    pub errors: Vec<String>,
}

pub fn write_sites<'a, I>(sites: I) -> String
where
    I: IntoIterator<Item = &'a SiteRecord>,
{
    let mut out = HEADERS.join(",");
    out.push('\n');

    for site in sites {
        let fields = [
            site.name.clone(),
            site.url.clone(),
            site.description.clone(),
            site.categories.join(&CATEGORY_SEPARATOR.to_string()),
            site.commission.map(|v| v.to_string()).unwrap_or_default(),
            site.ltv.map(|v| v.to_string()).unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

pub fn parse_sites(input: &str) -> Result<ParsedSites, CsvError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(CsvError::Empty)?;
    let headers: Vec<String> = split_line(header_line)
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|h| h.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingHeaders(missing));
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let columns = Columns {
        name: column("name"),
        url: column("url"),
        description: column("description"),
        categories: column("categories"),
        commission: column("commission"),
        ltv: column("ltv"),
    };

    let mut parsed = ParsedSites::default();
    for (line_no, line) in lines {
        let fields = split_line(line);
        match columns.record(&fields) {
            Ok(record) => parsed.records.push((line_no, record)),
            Err(msg) => parsed.errors.push(format!("Row {line_no}: {msg}")),
        }
    }

    Ok(parsed)
}

struct Columns {
    name: Option<usize>,
    url: Option<usize>,
    description: Option<usize>,
    categories: Option<usize>,
    commission: Option<usize>,
    ltv: Option<usize>,
}

impl Columns {
    fn record(&self, fields: &[String]) -> Result<SiteRecord, String> {
        let get = |col: Option<usize>| {
            col.and_then(|i| fields.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let name = get(self.name);
        if name.is_empty() {
            return Err("name is required".into());
        }
        let url = get(self.url);
        if url.is_empty() {
            return Err(format!("url is required for '{name}'"));
        }

        let categories = get(self.categories)
            .split(CATEGORY_SEPARATOR)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        Ok(SiteRecord {
            name,
            url,
            description: get(self.description),
            categories,
            commission: parse_number("commission", &get(self.commission))?,
            ltv: parse_number("ltv", &get(self.ltv))?,
        })
    }
}

fn parse_number(field: &str, raw: &str) -> Result<Option<f64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid {field} '{raw}'"))
}

fn quote(field: &str) -> String {
    let flat = field.replace(['\r', '\n'], " ");
    format!("\"{}\"", flat.replace('"', "\"\""))
}

/// Split one line on commas outside double quotes.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}
