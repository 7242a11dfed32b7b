use crate::domain::model::CustomerRecord;
use crate::utils::error::{Result, ShowAdsError};
use csv::{StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 逐列讀取客戶 CSV 的 lazy 資料來源。
///
/// 欄位檢查在開啟時完成；每列的解析錯誤則在迭代到該列時才回報，
/// 之前已產生的資料不受影響。來源只能往前讀一次，重新讀取需重新開啟。
pub struct CsvSource<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: ColumnIndex,
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    name: usize,
    age: usize,
    cookie: usize,
    banner_id: usize,
    width: usize,
}

impl CsvSource<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("📂 Opening customer CSV: {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        // flexible: 欄位數不符的列交給 parse_row 回報為 MalformedRecord，保留原始內容
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = ColumnIndex::resolve(&headers)?;

        Ok(Self {
            records: reader.into_records(),
            columns,
        })
    }
}

impl<R: Read> Iterator for CsvSource<R> {
    type Item = Result<CustomerRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        Some(row.map_err(ShowAdsError::from).and_then(|row| self.columns.parse_row(&row)))
    }
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);

        let [name, age, cookie, banner_id] = CustomerRecord::HEADER.map(position);
        match (name, age, cookie, banner_id) {
            (Some(name), Some(age), Some(cookie), Some(banner_id)) => Ok(Self {
                name,
                age,
                cookie,
                banner_id,
                width: headers.len(),
            }),
            _ => {
                let missing = CustomerRecord::HEADER
                    .into_iter()
                    .filter(|&wanted| position(wanted).is_none())
                    .map(str::to_string)
                    .collect();
                Err(ShowAdsError::MissingColumns { missing })
            }
        }
    }

    fn parse_row(&self, row: &StringRecord) -> Result<CustomerRecord> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| ShowAdsError::MalformedRecord {
            line,
            row: encode_row(row),
            reason,
        };

        if row.len() != self.width {
            return Err(malformed(format!(
                "expected {} fields, found {}",
                self.width,
                row.len()
            )));
        }

        let field = |index: usize| row.get(index).unwrap_or_default();
        let age = field(self.age)
            .trim()
            .parse::<i64>()
            .map_err(|_| malformed(format!("invalid age: {:?} is not an integer", field(self.age))))?;
        let banner_id = field(self.banner_id).trim().parse::<i64>().map_err(|_| {
            malformed(format!(
                "invalid banner id: {:?} is not an integer",
                field(self.banner_id)
            ))
        })?;

        Ok(CustomerRecord {
            name: field(self.name).trim().to_string(),
            age,
            cookie: field(self.cookie).trim().to_string(),
            banner_id,
        })
    }
}

/// 把解析後的欄位重新編碼成 CSV 列，保留必要的引號與逸出
fn encode_row(row: &StringRecord) -> String {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(row)
        .ok()
        .and_then(|_| writer.into_inner().ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
        .unwrap_or_else(|| row.iter().collect::<Vec<_>>().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(csv: &str) -> CsvSource<Cursor<Vec<u8>>> {
        CsvSource::from_reader(Cursor::new(csv.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_happy_path() {
        let items: Vec<_> = source("Name,Age,Cookie,Banner_id\nJohn Doe,30,c1,5\nJane Doe,20,c2,10\n")
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "John Doe");
        assert_eq!(items[1].banner_id, 10);
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let items: Vec<_> = source("Cookie,Banner_id,Age,Name\nc1,5,30,John\n")
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            items[0],
            CustomerRecord {
                name: "John".to_string(),
                age: 30,
                cookie: "c1".to_string(),
                banner_id: 5,
            }
        );
    }

    #[test]
    fn test_trims_name_and_cookie() {
        let items: Vec<_> = source("Name,Age,Cookie,Banner_id\n  John Doe  , 30 , c1 ,5\n")
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items[0].name, "John Doe");
        assert_eq!(items[0].cookie, "c1");
        assert_eq!(items[0].age, 30);
    }

    #[test]
    fn test_missing_headers() {
        let result = CsvSource::from_reader(Cursor::new(b"Name,Age\nJohn Doe,30\n".to_vec()));

        match result {
            Err(ShowAdsError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Cookie".to_string(), "Banner_id".to_string()]);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing columns error"),
        }
    }

    #[test]
    fn test_malformed_row_fails_lazily() {
        let mut rows = source("Name,Age,Cookie,Banner_id\nJohn,30,c1,5\nJane,abc,c2,5\nJim,40,c3,7\n");

        assert!(rows.next().unwrap().is_ok());
        match rows.next().unwrap() {
            Err(ShowAdsError::MalformedRecord { line, row, reason }) => {
                assert_eq!(line, 3);
                assert_eq!(row, "Jane,abc,c2,5");
                assert!(reason.contains("invalid age"));
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
        // 之後的列仍可繼續讀
        assert_eq!(rows.next().unwrap().unwrap().name, "Jim");
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_non_integer_banner_id() {
        let mut rows = source("Name,Age,Cookie,Banner_id\nJohn,30,c1,five\n");
        let err = rows.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("invalid banner id"));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let mut rows = source("Name,Age,Cookie,Banner_id\nJohn,30\n");
        let err = rows.next().unwrap().unwrap_err();
        assert!(matches!(err, ShowAdsError::MalformedRecord { .. }));
    }

    #[test]
    fn test_malformed_row_keeps_quoted_fields() {
        let mut rows = source(
            "Name,Age,Cookie,Banner_id\nJohn,\"thirty, or so\",\"c\"\"1\",5\n",
        );
        match rows.next().unwrap() {
            Err(ShowAdsError::MalformedRecord { row, .. }) => {
                assert_eq!(row, r#"John,"thirty, or so","c""1",5"#);
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = CsvSource::open("/definitely/not/here.csv");
        assert!(matches!(result, Err(ShowAdsError::IoError(_))));
    }
}
