//! In-memory eventlog server
//!
//! Logs live in process memory and are lost on drop. Records are returned by
//! `ElfrReadELW` in a simplified `EVENTLOGRECORD` layout (no SID block),
//! see [`Record::encode`].

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dcerpc::{ConnectionId, HandleTable, Result};
use msrpc_eventlog::ops::*;
use msrpc_eventlog::protocol::{read_flags, status, EVENTLOG_FULL_INFO};
use msrpc_eventlog::{EventlogServer, LogHandle};
use parking_lot::Mutex;
use tracing::debug;

/// Logs every server starts with. Unknown names open `Application`.
pub const DEFAULT_LOGS: [&str; 3] = ["Application", "System", "Security"];

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub record_number: u32,
    pub time_generated: u32,
    pub time_written: u32,
    pub event_id: u32,
    pub event_type: u16,
    pub event_category: u16,
    pub source: String,
    pub computer_name: String,
    pub strings: Vec<String>,
    pub data: Vec<u8>,
}

impl Record {
    const HEADER: usize = 40;

    /// Serialize as one length-prefixed, length-suffixed record.
    ///
    /// Header: length, record number, generated, written, event id (u32),
    /// type, string count, category, reserved (u16), then string offset,
    /// data length, data offset (u32). Source and computer name follow,
    /// then the insertion strings and the data, padded to 4.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        push_wstr(&mut body, &self.source);
        push_wstr(&mut body, &self.computer_name);
        let strings_offset = Self::HEADER + body.len();
        for s in &self.strings {
            push_wstr(&mut body, s);
        }
        let data_offset = Self::HEADER + body.len();
        body.extend_from_slice(&self.data);
        while (Self::HEADER + body.len()) % 4 != 0 {
            body.push(0);
        }
        let length = (Self::HEADER + body.len() + 4) as u32;

        let mut out = Vec::with_capacity(length as usize);
        for v in [
            length,
            self.record_number,
            self.time_generated,
            self.time_written,
            self.event_id,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in [self.event_type, self.strings.len() as u16, self.event_category, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in [strings_offset as u32, self.data.len() as u32, data_offset as u32] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&body);
        out.extend_from_slice(&length.to_le_bytes());
        out
    }

    /// Parse consecutive records. A zero length ends the buffer early
    /// (padding); any other inconsistency yields `None`.
    pub fn decode_all(mut buf: &[u8]) -> Option<Vec<Record>> {
        let mut records = Vec::new();
        while buf.len() >= 4 {
            let length = u32_at(buf, 0)? as usize;
            if length == 0 {
                break;
            }
            if length < Self::HEADER + 4 || length > buf.len() {
                return None;
            }
            let rec = &buf[..length];
            if u32_at(rec, length - 4)? as usize != length {
                return None;
            }
            let num_strings = u16_at(rec, 22)? as usize;
            let strings_offset = u32_at(rec, 28)? as usize;
            let data_length = u32_at(rec, 32)? as usize;
            let data_offset = u32_at(rec, 36)? as usize;

            let mut pos = Self::HEADER;
            let source = read_wstr(rec, &mut pos)?;
            let computer_name = read_wstr(rec, &mut pos)?;
            let mut pos = strings_offset;
            let strings = (0..num_strings)
                .map(|_| read_wstr(rec, &mut pos))
                .collect::<Option<Vec<_>>>()?;

            records.push(Record {
                record_number: u32_at(rec, 4)?,
                time_generated: u32_at(rec, 8)?,
                time_written: u32_at(rec, 12)?,
                event_id: u32_at(rec, 16)?,
                event_type: u16_at(rec, 20)?,
                event_category: u16_at(rec, 24)?,
                source,
                computer_name,
                strings,
                data: rec.get(data_offset..data_offset + data_length)?.to_vec(),
            });
            buf = &buf[length..];
        }
        Some(records)
    }
}

fn push_wstr(out: &mut Vec<u8>, s: &str) {
    for unit in s.encode_utf16().chain(std::iter::once(0)) {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

fn read_wstr(buf: &[u8], pos: &mut usize) -> Option<String> {
    let mut units = Vec::new();
    loop {
        let unit = u16_at(buf, *pos)?;
        *pos += 2;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16(&units).ok()
}

fn u16_at(buf: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(buf.get(at..at + 2)?.try_into().ok()?))
}

fn u32_at(buf: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
struct LogFile {
    records: Vec<Record>,
    next_record: u32,
    capacity: usize,
}

impl LogFile {
    fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            next_record: 1,
            capacity,
        }
    }

    fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Append, rolling the oldest record off a full log.
    fn append(&mut self, mut record: Record) -> (u32, u32) {
        if self.is_full() && !self.records.is_empty() {
            self.records.remove(0);
        }
        record.record_number = self.next_record;
        self.next_record += 1;
        let assigned = (record.record_number, record.time_written);
        self.records.push(record);
        assigned
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Live(String),
    Backup(String),
}

#[derive(Debug, Clone)]
struct Session {
    target: Target,
    /// Set for handles from `ElfrRegisterEventSourceW`
    source: Option<String>,
    /// Next record for sequential reads
    cursor: Option<u32>,
}

pub struct MemoryEventlog {
    logs: Mutex<HashMap<String, LogFile>>,
    backups: Mutex<HashMap<String, LogFile>>,
    handles: HandleTable<Session>,
}

impl MemoryEventlog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Every log holds at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        let logs = DEFAULT_LOGS
            .iter()
            .map(|name| (name.to_string(), LogFile::new(capacity)))
            .collect();
        Self {
            logs: Mutex::new(logs),
            backups: Mutex::new(HashMap::new()),
            handles: HandleTable::new(),
        }
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Connection rundown: drop the handles `conn` opened.
    pub fn revoke_handles(&self, conn: ConnectionId) -> usize {
        self.handles.revoke_owner(conn)
    }

    pub fn records(&self, log: &str) -> Vec<Record> {
        self.logs
            .lock()
            .get(log)
            .map(|f| f.records.clone())
            .unwrap_or_default()
    }

    fn with_file<R>(&self, target: &Target, f: impl FnOnce(&mut LogFile) -> R) -> Option<R> {
        match target {
            Target::Live(name) => self.logs.lock().get_mut(name).map(f),
            Target::Backup(name) => self.backups.lock().get_mut(name).map(f),
        }
    }

    fn open_live(&self, module_name: &str, source: Option<String>) -> LogHandle {
        let name = if self.logs.lock().contains_key(module_name) {
            module_name.to_string()
        } else {
            debug!("No log named {:?}, using Application", module_name);
            DEFAULT_LOGS[0].to_string()
        };
        self.handles.open(Session {
            target: Target::Live(name),
            source,
            cursor: None,
        })
    }

    fn backup_to(&self, target: &Target, backup_file_name: &str) -> i32 {
        if backup_file_name.is_empty() {
            return status::STATUS_INVALID_PARAMETER;
        }
        match self.with_file(target, |file| file.clone()) {
            Some(copy) => {
                self.backups.lock().insert(backup_file_name.to_string(), copy);
                status::STATUS_SUCCESS
            }
            None => status::STATUS_INVALID_HANDLE,
        }
    }
}

impl Default for MemoryEventlog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventlogServer for MemoryEventlog {
    async fn clear_event_log(&self, req: ClearEventLogWRequest) -> Result<ClearEventLogWResponse> {
        let session = self.handles.get(&req.log)?;
        if !matches!(session.target, Target::Live(_)) {
            return Ok(ClearEventLogWResponse {
                status: status::STATUS_INVALID_HANDLE,
            });
        }
        if let Some(name) = req.backup_file_name.as_deref() {
            let code = self.backup_to(&session.target, name);
            if code != status::STATUS_SUCCESS {
                return Ok(ClearEventLogWResponse { status: code });
            }
        }
        self.with_file(&session.target, |file| file.records.clear());
        Ok(ClearEventLogWResponse {
            status: status::STATUS_SUCCESS,
        })
    }

    async fn backup_event_log(&self, req: BackupEventLogWRequest) -> Result<BackupEventLogWResponse> {
        let session = self.handles.get(&req.log)?;
        Ok(BackupEventLogWResponse {
            status: self.backup_to(&session.target, &req.backup_file_name),
        })
    }

    async fn close_event_log(&self, req: CloseEventLogRequest) -> Result<CloseEventLogResponse> {
        self.handles.close(&req.log)?;
        Ok(CloseEventLogResponse {
            log: LogHandle::nil(),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn deregister_event_source(
        &self,
        req: DeregisterEventSourceRequest,
    ) -> Result<DeregisterEventSourceResponse> {
        self.handles.close(&req.log)?;
        Ok(DeregisterEventSourceResponse {
            log: LogHandle::nil(),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn number_of_records(&self, req: NumberOfRecordsRequest) -> Result<NumberOfRecordsResponse> {
        let session = self.handles.get(&req.log)?;
        let count = self.with_file(&session.target, |file| file.records.len() as u32);
        Ok(NumberOfRecordsResponse {
            number_of_records: count.unwrap_or(0),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn oldest_record(&self, req: OldestRecordRequest) -> Result<OldestRecordResponse> {
        let session = self.handles.get(&req.log)?;
        let oldest = self.with_file(&session.target, |file| {
            file.records.first().map(|r| r.record_number).unwrap_or(0)
        });
        Ok(OldestRecordResponse {
            oldest_record_number: oldest.unwrap_or(0),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn open_event_log(&self, req: OpenEventLogWRequest) -> Result<OpenEventLogWResponse> {
        if !req.reg_module_name.is_empty() {
            return Ok(OpenEventLogWResponse {
                log: LogHandle::nil(),
                status: status::STATUS_INVALID_PARAMETER,
            });
        }
        Ok(OpenEventLogWResponse {
            log: self.open_live(&req.module_name, None),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn register_event_source(
        &self,
        req: RegisterEventSourceWRequest,
    ) -> Result<RegisterEventSourceWResponse> {
        if !req.reg_module_name.is_empty() || req.module_name.is_empty() {
            return Ok(RegisterEventSourceWResponse {
                log: LogHandle::nil(),
                status: status::STATUS_INVALID_PARAMETER,
            });
        }
        // sources write to Application
        let source = Some(req.module_name);
        Ok(RegisterEventSourceWResponse {
            log: self.open_live(DEFAULT_LOGS[0], source),
            status: status::STATUS_SUCCESS,
        })
    }

    async fn open_backup_event_log(
        &self,
        req: OpenBackupEventLogWRequest,
    ) -> Result<OpenBackupEventLogWResponse> {
        if !self.backups.lock().contains_key(&req.backup_file_name) {
            return Ok(OpenBackupEventLogWResponse {
                log: LogHandle::nil(),
                status: status::STATUS_INVALID_PARAMETER,
            });
        }
        let log = self.handles.open(Session {
            target: Target::Backup(req.backup_file_name),
            source: None,
            cursor: None,
        });
        Ok(OpenBackupEventLogWResponse {
            log,
            status: status::STATUS_SUCCESS,
        })
    }

    async fn read_event_log(&self, req: ReadEventLogWRequest) -> Result<ReadEventLogWResponse> {
        let session = self.handles.get(&req.log)?;
        let flags = req.read_flags;
        let seek = flags & read_flags::EVENTLOG_SEEK_READ != 0;
        let sequential = flags & read_flags::EVENTLOG_SEQUENTIAL_READ != 0;
        let forwards = flags & read_flags::EVENTLOG_FORWARDS_READ != 0;
        let backwards = flags & read_flags::EVENTLOG_BACKWARDS_READ != 0;
        let failed = |status: i32| ReadEventLogWResponse {
            status,
            ..ReadEventLogWResponse::default()
        };
        if seek == sequential || forwards == backwards {
            return Ok(failed(status::STATUS_INVALID_PARAMETER));
        }

        let start = if seek {
            req.record_offset
        } else {
            session.cursor.unwrap_or(if backwards { u32::MAX } else { 0 })
        };
        let records = self
            .with_file(&session.target, |file| file.records.clone())
            .unwrap_or_default();
        let ordered: Vec<&Record> = if backwards {
            records.iter().rev().filter(|r| r.record_number <= start).collect()
        } else {
            records.iter().filter(|r| r.record_number >= start).collect()
        };

        let limit = req.number_of_bytes_to_read as usize;
        let mut buffer = Vec::new();
        let mut last = None;
        for record in ordered {
            let encoded = record.encode();
            if buffer.len() + encoded.len() > limit {
                if buffer.is_empty() {
                    return Ok(ReadEventLogWResponse {
                        min_number_of_bytes_needed: encoded.len() as u32,
                        ..failed(status::STATUS_BUFFER_TOO_SMALL)
                    });
                }
                break;
            }
            buffer.extend_from_slice(&encoded);
            last = Some(record.record_number);
        }

        let Some(last) = last else {
            return Ok(failed(status::STATUS_END_OF_FILE));
        };
        let next = if backwards { last.saturating_sub(1) } else { last + 1 };
        self.handles.with_mut(&req.log, |s| s.cursor = Some(next))?;

        Ok(ReadEventLogWResponse {
            number_of_bytes_to_read: 0,
            number_of_bytes_read: buffer.len() as u32,
            buffer,
            min_number_of_bytes_needed: 0,
            status: status::STATUS_SUCCESS,
        })
    }

    async fn report_event(&self, req: ReportEventWRequest) -> Result<ReportEventWResponse> {
        let session = self.handles.get(&req.log)?;
        let Some(source) = session.source else {
            return Ok(ReportEventWResponse {
                status: status::STATUS_INVALID_HANDLE,
                ..ReportEventWResponse::default()
            });
        };
        let record = Record {
            record_number: 0,
            time_generated: req.time,
            time_written: now(),
            event_id: req.event_id,
            event_type: req.event_type,
            event_category: req.event_category,
            source,
            computer_name: req.computer_name,
            strings: req.strings.into_iter().map(Option::unwrap_or_default).collect(),
            data: req.data,
        };
        let assigned = self.with_file(&session.target, |file| file.append(record));
        let (record_number, time_written) = assigned.unwrap_or_default();
        debug!("Reported event {} as record {}", req.event_id, record_number);
        Ok(ReportEventWResponse {
            record_number,
            time_written,
            status: status::STATUS_SUCCESS,
        })
    }

    async fn get_log_information(
        &self,
        req: GetLogInformationRequest,
    ) -> Result<GetLogInformationResponse> {
        let session = self.handles.get(&req.log)?;
        if req.info_level != EVENTLOG_FULL_INFO {
            return Ok(GetLogInformationResponse {
                status: status::STATUS_INVALID_PARAMETER,
                ..GetLogInformationResponse::default()
            });
        }
        if req.buffer_length < 4 {
            return Ok(GetLogInformationResponse {
                bytes_needed: 4,
                status: status::STATUS_BUFFER_TOO_SMALL,
                ..GetLogInformationResponse::default()
            });
        }
        let full = self
            .with_file(&session.target, |file| file.is_full())
            .unwrap_or(false);
        Ok(GetLogInformationResponse {
            buffer_length: 0,
            buffer: (full as u32).to_le_bytes().to_vec(),
            bytes_needed: 4,
            status: status::STATUS_SUCCESS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let record = Record {
            record_number: 3,
            time_generated: 10,
            time_written: 11,
            event_id: 1000,
            event_type: 4,
            event_category: 2,
            source: "svc".into(),
            computer_name: "HOST".into(),
            strings: vec!["a".into(), "bc".into()],
            data: vec![1, 2, 3],
        };
        let bytes = record.encode();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(u32_at(&bytes, 0), Some(bytes.len() as u32));
        assert_eq!(u32_at(&bytes, bytes.len() - 4), Some(bytes.len() as u32));

        let mut two = bytes.clone();
        two.extend_from_slice(&bytes);
        two.extend_from_slice(&[0; 8]);
        let back = Record::decode_all(&two).unwrap();
        assert_eq!(back, vec![record.clone(), record]);
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let bytes = Record::default().encode();
        assert!(Record::decode_all(&bytes[..bytes.len() - 4]).is_none());
    }

    #[test]
    fn test_full_log_rolls_oldest_off() {
        let mut file = LogFile::new(2);
        for _ in 0..3 {
            file.append(Record::default());
        }
        let numbers: Vec<_> = file.records.iter().map(|r| r.record_number).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert!(file.is_full());
    }
}
