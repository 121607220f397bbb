use crate::error::{Error, Result};
use crate::registry::{self, StudentRecord};
use crate::workspace::{self, Workspace};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const COLUMNS: [&str; 4] = ["Date", "Student ID", "Name", "Status"];
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "Present",
            Status::Absent => "Absent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Present" => Ok(Status::Present),
            "Absent" => Ok(Status::Absent),
            other => Err(format!("unknown status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub date: String,
    pub student_id: String,
    pub name: String,
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceLog {
    pub rows: Vec<AttendanceEntry>,
}

/// Which students a marking event records as present.
#[derive(Debug, Clone)]
pub enum Selection {
    ById(HashSet<String>),
    /// Legacy matching: every student carrying a selected name is present.
    ByName(HashSet<String>),
}

impl Selection {
    fn is_present(&self, student: &StudentRecord) -> bool {
        match self {
            Selection::ById(ids) => ids.contains(&student.id),
            Selection::ByName(names) => names.contains(&student.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTally {
    pub student_id: String,
    pub name: String,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub dates_recorded: usize,
    pub students: Vec<StudentTally>,
}

impl AttendanceLog {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn parse(text: &str) -> Result<Self> {
        // Spreadsheet exports may lead with a UTF-8 BOM.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let records = split_csv_records(text);
        let mut it = records.into_iter();
        let Some((header_line, header)) = it.next() else {
            return Ok(Self::default());
        };
        let header: Vec<&str> = header.iter().map(|h| h.trim()).collect();
        if header != COLUMNS {
            return Err(Error::LogFormat {
                line: header_line,
                message: format!("expected header {}, found {}", COLUMNS.join(","), header.join(",")),
            });
        }

        let mut rows = Vec::new();
        for (line, fields) in it {
            if fields.len() != COLUMNS.len() {
                return Err(Error::LogFormat {
                    line,
                    message: format!("expected {} fields, found {}", COLUMNS.len(), fields.len()),
                });
            }
            let mut fields = fields.into_iter();
            let date = fields.next().unwrap_or_default();
            let student_id = fields.next().unwrap_or_default();
            let name = fields.next().unwrap_or_default();
            let status = fields
                .next()
                .unwrap_or_default()
                .parse::<Status>()
                .map_err(|message| Error::LogFormat { line, message })?;
            rows.push(AttendanceEntry {
                date,
                student_id,
                name,
                status,
            });
        }
        Ok(Self { rows })
    }

    pub fn to_csv(&self) -> String {
        let mut csv = empty_log_csv();
        for row in &self.rows {
            push_csv_row(&mut csv, row);
        }
        csv
    }

    pub fn summary(&self) -> LogSummary {
        let dates: BTreeSet<&str> = self.rows.iter().map(|r| r.date.as_str()).collect();
        let mut order: Vec<StudentTally> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            let idx = *index.entry(row.student_id.as_str()).or_insert_with(|| {
                order.push(StudentTally {
                    student_id: row.student_id.clone(),
                    name: row.name.clone(),
                    present: 0,
                    absent: 0,
                });
                order.len() - 1
            });
            match row.status {
                Status::Present => order[idx].present += 1,
                Status::Absent => order[idx].absent += 1,
            }
        }
        LogSummary {
            dates_recorded: dates.len(),
            students: order,
        }
    }
}

pub fn empty_log_csv() -> String {
    format!("{}\n", COLUMNS.join(","))
}

pub fn load_log(ws: &Workspace) -> Result<AttendanceLog> {
    let _guard = ws.lock()?;
    read_log(ws.attendance_path())
}

/// Record one row per registered student for `date`, in registry order.
///
/// Resubmitting the same date appends a second set of rows.
pub fn mark_attendance(
    ws: &Workspace,
    date: NaiveDate,
    selection: &Selection,
) -> Result<Vec<AttendanceEntry>> {
    let _guard = ws.lock()?;
    let students = registry::read_students(ws.students_path())?;
    if students.is_empty() {
        return Err(Error::EmptyRegistry);
    }
    if let Selection::ById(ids) = selection {
        let mut unknown: Vec<&String> = ids
            .iter()
            .filter(|id| !students.iter().any(|s| &s.id == *id))
            .collect();
        unknown.sort();
        if let Some(id) = unknown.first() {
            return Err(Error::UnknownStudent { id: id.to_string() });
        }
    }

    let date = date.format(DATE_FORMAT).to_string();
    let appended: Vec<AttendanceEntry> = students
        .iter()
        .map(|s| AttendanceEntry {
            date: date.clone(),
            student_id: s.id.clone(),
            name: s.name.clone(),
            status: if selection.is_present(s) {
                Status::Present
            } else {
                Status::Absent
            },
        })
        .collect();

    let mut log = read_log(ws.attendance_path())?;
    log.rows.extend(appended.iter().cloned());
    workspace::write_atomic(ws.attendance_path(), log.to_csv().as_bytes())?;
    Ok(appended)
}

/// A serialized snapshot of the log, ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct LogExport {
    pub bytes: Vec<u8>,
    pub rows: usize,
}

pub fn export_log(ws: &Workspace) -> Result<LogExport> {
    let log = load_log(ws)?;
    Ok(LogExport {
        bytes: log.to_csv().into_bytes(),
        rows: log.rows.len(),
    })
}

/// Today's local date, or `raw` parsed as `YYYY-MM-DD`.
pub fn resolve_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(chrono::Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|_| Error::bad_params(format!("date must be YYYY-MM-DD, got {:?}", s))),
    }
}

fn read_log(path: &Path) -> Result<AttendanceLog> {
    match workspace::read_optional(path)? {
        Some(text) => AttendanceLog::parse(&text),
        None => Ok(AttendanceLog::default()),
    }
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn push_csv_row(out: &mut String, row: &AttendanceEntry) {
    out.push_str(&format!(
        "{},{},{},{}\n",
        csv_quote(&row.date),
        csv_quote(&row.student_id),
        csv_quote(&row.name),
        row.status
    ));
}

/// Split CSV text into records, each tagged with the 1-based line it starts
/// on. Quoted fields may span lines. Blank lines are skipped.
fn split_csv_records(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut out = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut start_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    buf.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    buf.push(ch);
                }
                _ => buf.push(ch),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut buf)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if !fields.is_empty() || !buf.is_empty() {
                    fields.push(std::mem::take(&mut buf));
                    out.push((start_line, std::mem::take(&mut fields)));
                }
                line += 1;
                start_line = line;
            }
            _ => buf.push(ch),
        }
    }
    if !fields.is_empty() || !buf.is_empty() {
        fields.push(buf);
        out.push((start_line, fields));
    }
    out
}
