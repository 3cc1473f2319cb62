//! # Contact Exporter
//!
//! Renders contacts submitted in an inclusive range of local days as a
//! semicolon-delimited file. Every field is double-quoted, the header
//! included. The whole result set is fetched before anything is rendered,
//! so a failed fetch never yields a partial file.

use chrono::{Datelike, NaiveDate};
use savania_core::contact::{field, COLLECTION};
use savania_core::format::format_date_fr;
use savania_core::{ContactRecord, LocalCalendar};
use savania_store::query::timestamp;
use savania_store::{Direction, DocumentStore, Query, StoreError};

use crate::error::ExportError;

/// Column titles, in output order.
pub const HEADER: [&str; 7] = [
    "Nom",
    "Email",
    "Téléphone",
    "Service",
    "Sujet",
    "Date",
    "Statut",
];

const DELIMITER: &str = ";";

/// Inclusive range of local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl ExportRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ExportError> {
        if from > to {
            return Err(ExportError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// First day of `today`'s month through `today`.
    pub fn default_for(today: NaiveDate) -> Self {
        Self {
            from: today.with_day(1).unwrap_or(today),
            to: today,
        }
    }

    /// Either bound may be omitted; missing bounds come from
    /// [`ExportRange::default_for`].
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ExportError> {
        let default = Self::default_for(today);
        Self::new(from.unwrap_or(default.from), to.unwrap_or(default.to))
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Contacts submitted in `[from 00:00, to+1 00:00)` local, oldest first.
    pub fn query(&self, calendar: &LocalCalendar) -> Result<Query, ExportError> {
        let window = calendar.days_window(self.from, self.to)?;
        Ok(Query::collection(COLLECTION)
            .where_gte(field::SUBMITTED_AT, timestamp(window.start))
            .where_lt(field::SUBMITTED_AT, timestamp(window.end))
            .order_by(field::SUBMITTED_AT, Direction::Asc))
    }
}

/// Double-quote a field. Embedded quotes are doubled and line breaks become
/// spaces, so each record stays on one line.
pub fn quote_field(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    format!("\"{}\"", flat.replace('"', "\"\""))
}

fn join(fields: impl IntoIterator<Item = String>) -> String {
    fields.into_iter().collect::<Vec<_>>().join(DELIMITER)
}

/// One output line for a contact. Service and status are the stored
/// values; the date is the local submission day, `dd/mm/yyyy`.
pub fn contact_row(record: &ContactRecord, calendar: &LocalCalendar) -> String {
    let c = &record.contact;
    join(
        [
            c.name.as_str(),
            c.email.as_str(),
            c.phone.as_deref().unwrap_or(""),
            c.service.as_str(),
            c.subject.as_str(),
            &format_date_fr(calendar.local_date(c.submitted_at)),
            c.status.as_str(),
        ]
        .into_iter()
        .map(quote_field),
    )
}

/// Header plus one line per record, `\n`-terminated.
pub fn render_csv(records: &[ContactRecord], calendar: &LocalCalendar) -> String {
    let mut out = join(HEADER.iter().map(|h| quote_field(h)));
    out.push('\n');
    for record in records {
        out.push_str(&contact_row(record, calendar));
        out.push('\n');
    }
    out
}

/// `contacts_savania_<YYYY-MM-DD>.csv`.
pub fn file_name(today: NaiveDate) -> String {
    format!("contacts_savania_{}.csv", today.format("%Y-%m-%d"))
}

/// A rendered export.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub body: String,
    pub rows: usize,
}

/// Fetch and render the contacts in `range`.
///
/// A malformed document aborts the export like a fetch failure does.
pub async fn export_contacts(
    store: &dyn DocumentStore,
    calendar: &LocalCalendar,
    range: ExportRange,
    today: NaiveDate,
) -> Result<CsvExport, ExportError> {
    let documents = store.query(&range.query(calendar)?).await.map_err(|e| {
        tracing::error!(error = %e, "contact export fetch failed");
        e
    })?;
    let records = documents
        .into_iter()
        .map(|doc| {
            let contact = doc.decode()?;
            Ok(ContactRecord {
                id: doc.id.into(),
                contact,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    let body = render_csv(&records, calendar);
    tracing::info!(
        from = %range.from,
        to = %range.to,
        rows = records.len(),
        "contacts exported"
    );
    Ok(CsvExport {
        file_name: file_name(today),
        body,
        rows: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use savania_core::ContactId;
    use savania_store::MemoryStore;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    /// Split a line on delimiters that sit outside quotes.
    fn split_quoted(line: &str) -> Vec<String> {
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
                ';' if !in_quotes => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        fields.push(current);
        fields
    }

    async fn seed(store: &MemoryStore) {
        let rows = [
            ("a", "Afi \"la grande\"", "2026-10-01T00:00:00Z"),
            ("b", "Kofi", "2026-10-10T12:00:00Z"),
            ("c", "Ama;Yawa", "2026-10-20T23:59:59Z"),
            ("late", "Hors plage", "2026-10-21T00:00:00Z"),
            ("early", "Hors plage", "2026-09-30T23:59:59Z"),
        ];
        for (id, name, at) in rows {
            store
                .set(
                    COLLECTION,
                    id,
                    json!({"nom": name, "email": "x@y.tg", "service": "piscine", "sujet": "Ligne 1\nLigne 2",
                           "message": "m", "date_soumission": at, "statut": "nouveau"}),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn n_records_give_n_plus_one_lines_of_seven_quoted_fields() {
        let store = MemoryStore::new();
        seed(&store).await;
        let cal = LocalCalendar::utc();
        let range = ExportRange::new(day(1), day(20)).unwrap();
        let export = export_contacts(&store, &cal, range, day(21)).await.unwrap();

        assert_eq!(export.rows, 3);
        assert_eq!(export.file_name, "contacts_savania_2026-10-21.csv");
        let lines: Vec<&str> = export.body.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in &lines {
            let fields = split_quoted(line);
            assert_eq!(fields.len(), 7, "line {line}");
            assert!(line.starts_with('"') && line.ends_with('"'));
        }
        assert_eq!(split_quoted(lines[0]), HEADER);
        assert_eq!(split_quoted(lines[1])[0], "Afi \"la grande\"");
        assert_eq!(split_quoted(lines[1])[4], "Ligne 1 Ligne 2");
        assert_eq!(split_quoted(lines[3])[0], "Ama;Yawa");
        assert_eq!(split_quoted(lines[1])[3], "piscine");
        assert_eq!(split_quoted(lines[1])[5], "01/10/2026");
        assert_eq!(split_quoted(lines[1])[6], "nouveau");
    }

    #[tokio::test]
    async fn fetch_failure_aborts() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let range = ExportRange::default_for(day(21));
        let err = export_contacts(&store, &LocalCalendar::utc(), range, day(21))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Store(_)));
    }

    #[tokio::test]
    async fn malformed_document_aborts() {
        let store = MemoryStore::new();
        store
            .set(COLLECTION, "bad", json!({"date_soumission": "2026-10-05T00:00:00Z"}))
            .await
            .unwrap();
        let range = ExportRange::default_for(day(21));
        assert!(export_contacts(&store, &LocalCalendar::utc(), range, day(21))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn range_ending_on_the_last_calendar_day_is_rejected() {
        let store = MemoryStore::new();
        let range = ExportRange::new(day(1), NaiveDate::MAX).unwrap();
        let err = export_contacts(&store, &LocalCalendar::utc(), range, day(21))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Date(_)));
    }

    #[test]
    fn ranges() {
        assert!(ExportRange::new(day(5), day(4)).is_err());
        let r = ExportRange::default_for(day(21));
        assert_eq!((r.from(), r.to()), (day(1), day(21)));
        let r = ExportRange::resolve(Some(day(3)), None, day(21)).unwrap();
        assert_eq!((r.from(), r.to()), (day(3), day(21)));
    }

    #[test]
    fn date_column_is_the_local_day() {
        let record = ContactRecord {
            id: ContactId::new("x"),
            contact: serde_json::from_value(json!({
                "nom": "Ama", "email": "a@b.tg", "service": "bubble-tea", "sujet": "s",
                "message": "m", "date_soumission": "2026-10-20T23:30:00Z", "statut": "traite"
            }))
            .unwrap(),
        };
        let east = LocalCalendar::parse_offset("+01:00").unwrap();
        let fields = split_quoted(&contact_row(&record, &east));
        assert_eq!(fields[5], "21/10/2026");
        assert_eq!(fields[6], "traite");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_field("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_field("a\r\nb"), "\"a  b\"");
        assert_eq!(quote_field(""), "\"\"");
    }

    #[test]
    fn empty_export_is_header_only() {
        let body = render_csv(&[], &LocalCalendar::utc());
        assert_eq!(body.lines().count(), 1);
    }
}
