//! 注册表状态与身份规则
//!
//! 内存实现与文件实现共用同一份状态机，保证身份规则一致：
//! - `id` 单调递增，删除或清空后不回退
//! - 被删除记录的 uid 进入退役集合，之后不可再次使用

use crate::error::StoreError;
use domain::{
    DeviceKey, NewPrinter, PrinterRecord, new_uid, validate_new_printer, validate_record,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryState {
    last_id: u64,
    retired_uids: BTreeSet<String>,
    printers: BTreeMap<u64, PrinterRecord>,
}

/// 落盘格式（printers.json）。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegistryFile {
    version: u32,
    last_id: u64,
    #[serde(default)]
    retired_uids: Vec<String>,
    #[serde(default)]
    printers: Vec<PrinterRecord>,
}

impl RegistryState {
    pub fn get(&self, key: &DeviceKey) -> Result<PrinterRecord, StoreError> {
        let found = match key {
            DeviceKey::ById(id) => self.printers.get(id),
            DeviceKey::ByUid(_) => self.printers.values().find(|record| key.matches(record)),
        };
        found
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub fn all(&self) -> Vec<PrinterRecord> {
        self.printers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.printers.len()
    }

    pub fn insert(&mut self, printer: NewPrinter) -> Result<PrinterRecord, StoreError> {
        let mut inserted = self.insert_many(vec![printer])?;
        inserted
            .pop()
            .ok_or_else(|| StoreError::io("insert produced no record"))
    }

    /// 先整体校验再写入，保证批量操作的原子性。
    pub fn insert_many(
        &mut self,
        printers: Vec<NewPrinter>,
    ) -> Result<Vec<PrinterRecord>, StoreError> {
        let mut batch_uids = HashSet::new();
        let mut prepared = Vec::with_capacity(printers.len());
        for printer in printers {
            validate_new_printer(&printer)?;
            let uid = match printer.uid.as_deref() {
                Some(uid) => uid.to_ascii_lowercase(),
                None => new_uid(),
            };
            self.ensure_uid_available(&uid)?;
            if !batch_uids.insert(uid.clone()) {
                return Err(StoreError::Conflict(format!("uid {uid} repeated in batch")));
            }
            prepared.push((uid, printer));
        }

        let mut inserted = Vec::with_capacity(prepared.len());
        for (uid, printer) in prepared {
            self.last_id += 1;
            let record = printer.into_record(self.last_id, uid);
            self.printers.insert(record.id, record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    pub fn update(&mut self, record: PrinterRecord) -> Result<PrinterRecord, StoreError> {
        validate_record(&record)?;
        let existing = self
            .printers
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::NotFound(DeviceKey::ById(record.id).to_string()))?;
        if !existing.uid.eq_ignore_ascii_case(&record.uid) {
            return Err(StoreError::Conflict(format!(
                "uid of printer {} is immutable",
                record.id
            )));
        }
        let uid = existing.uid.clone();
        *existing = PrinterRecord { uid, ..record };
        Ok(existing.clone())
    }

    pub fn remove(&mut self, id: u64) -> Result<PrinterRecord, StoreError> {
        let record = self
            .printers
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(DeviceKey::ById(id).to_string()))?;
        self.retired_uids.insert(record.uid.clone());
        Ok(record)
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.printers.len();
        let printers = std::mem::take(&mut self.printers);
        self.retired_uids
            .extend(printers.into_values().map(|record| record.uid));
        removed
    }

    fn ensure_uid_available(&self, uid: &str) -> Result<(), StoreError> {
        if self.retired_uids.contains(uid) {
            return Err(StoreError::Conflict(format!("uid {uid} was retired")));
        }
        if self
            .printers
            .values()
            .any(|record| record.uid.eq_ignore_ascii_case(uid))
        {
            return Err(StoreError::Conflict(format!("uid {uid} already exists")));
        }
        Ok(())
    }

    pub fn to_file(&self) -> RegistryFile {
        RegistryFile {
            version: FORMAT_VERSION,
            last_id: self.last_id,
            retired_uids: self.retired_uids.iter().cloned().collect(),
            printers: self.all(),
        }
    }

    pub fn from_file(file: RegistryFile) -> Result<Self, StoreError> {
        if file.version != FORMAT_VERSION {
            return Err(StoreError::io(format!(
                "unsupported registry format version {}",
                file.version
            )));
        }
        let mut state = Self {
            last_id: file.last_id,
            retired_uids: file.retired_uids.into_iter().collect(),
            printers: BTreeMap::new(),
        };
        for record in file.printers {
            // 兼容手工编辑过的文件：last_id 不得小于已有 id
            state.last_id = state.last_id.max(record.id);
            state.printers.insert(record.id, record);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PrinterStatus;

    fn new_printer(uid: Option<&str>) -> NewPrinter {
        NewPrinter {
            uid: uid.map(str::to_string),
            name: "printer".to_string(),
            ip: "10.0.0.5".to_string(),
            port: 9100,
            status: PrinterStatus::Idle,
            line: None,
            description: None,
        }
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut state = RegistryState::default();
        state.insert(new_printer(None)).unwrap();
        state.insert(new_printer(None)).unwrap();
        assert_eq!(state.clear(), 2);
        let record = state.insert(new_printer(None)).unwrap();
        assert_eq!(record.id, 3);
    }

    #[test]
    fn uid_is_normalised_to_lowercase() {
        let mut state = RegistryState::default();
        let record = state
            .insert(new_printer(Some("0F8FAD5B-D9CB-469F-A165-70867728950E")))
            .unwrap();
        assert_eq!(record.uid, "0f8fad5b-d9cb-469f-a165-70867728950e");
    }

    #[test]
    fn file_round_trip_keeps_counters() {
        let mut state = RegistryState::default();
        let first = state.insert(new_printer(None)).unwrap();
        state.remove(first.id).unwrap();
        state.insert(new_printer(None)).unwrap();

        let restored = RegistryState::from_file(state.to_file()).unwrap();
        assert_eq!(restored.last_id, 2);
        assert!(restored.retired_uids.contains(&first.uid));
        assert_eq!(restored.len(), 1);
    }
}
