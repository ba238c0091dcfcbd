//! Typed views over parsed `nvidia-smi` rows.
//!
//! Field access is validated once, when a [`MetricRecord`] is converted, so
//! the tracker and reporter never deal with missing keys.

use crate::error::MalformedTableError;
use crate::table::{FieldValue, MetricRecord};

/// A compute process as reported by `--query-compute-apps`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub process_name: String,
    pub gpu_uuid: String,
}

/// A device as reported by `--query-gpu`. `None` means the tool printed N/A.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub index: String,
    pub gpu_uuid: String,
    pub utilization: Option<f64>,
    pub power_draw: Option<f64>,
    pub power_limit: Option<f64>,
}

fn field<'a>(rec: &'a MetricRecord, name: &str) -> Result<&'a FieldValue, MalformedTableError> {
    rec.get(name)
        .ok_or_else(|| MalformedTableError::MissingField(name.to_string()))
}

/// Display strings keep N/A visible rather than failing on it.
fn text(rec: &MetricRecord, name: &str) -> Result<String, MalformedTableError> {
    Ok(field(rec, name)?.to_string())
}

fn number(rec: &MetricRecord, name: &str) -> Result<Option<f64>, MalformedTableError> {
    match field(rec, name)? {
        FieldValue::Number(v) => Ok(Some(*v)),
        FieldValue::NotAvailable => Ok(None),
        FieldValue::Text(s) => Err(MalformedTableError::InvalidValue {
            field: name.to_string(),
            value: s.clone(),
        }),
    }
}

impl TryFrom<&MetricRecord> for ProcessRecord {
    type Error = MalformedTableError;

    fn try_from(rec: &MetricRecord) -> Result<Self, Self::Error> {
        let raw = field(rec, "pid")?;
        let pid = match raw {
            FieldValue::Text(s) => s.parse::<u32>().ok(),
            _ => None,
        }
        .ok_or_else(|| MalformedTableError::InvalidValue {
            field: "pid".into(),
            value: raw.to_string(),
        })?;

        Ok(ProcessRecord {
            pid,
            process_name: text(rec, "process_name")?,
            gpu_uuid: text(rec, "gpu_uuid")?,
        })
    }
}

impl TryFrom<&MetricRecord> for DeviceRecord {
    type Error = MalformedTableError;

    fn try_from(rec: &MetricRecord) -> Result<Self, Self::Error> {
        Ok(DeviceRecord {
            index: text(rec, "index")?,
            // --query-gpu echoes the canonical header `uuid`.
            gpu_uuid: text(rec, "gpu_uuid").or_else(|_| text(rec, "uuid"))?,
            utilization: number(rec, "utilization.gpu")?,
            power_draw: number(rec, "power.draw")?,
            power_limit: number(rec, "power.max_limit")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    #[test]
    fn test_process_record_from_row() {
        let recs = parse_table("pid, process_name, gpu_uuid\n4242, python3, GPU-abc\n").unwrap();
        let proc = ProcessRecord::try_from(&recs[0]).unwrap();
        assert_eq!(
            proc,
            ProcessRecord {
                pid: 4242,
                process_name: "python3".into(),
                gpu_uuid: "GPU-abc".into(),
            }
        );
    }

    #[test]
    fn test_process_record_rejects_non_numeric_pid() {
        let recs = parse_table("pid, process_name, gpu_uuid\nabc, python3, GPU-abc\n").unwrap();
        let err = ProcessRecord::try_from(&recs[0]).unwrap_err();
        assert!(matches!(err, MalformedTableError::InvalidValue { ref field, .. } if field == "pid"));
    }

    #[test]
    fn test_process_record_missing_field() {
        let recs = parse_table("pid, gpu_uuid\n1, GPU-abc\n").unwrap();
        let err = ProcessRecord::try_from(&recs[0]).unwrap_err();
        assert_eq!(err, MalformedTableError::MissingField("process_name".into()));
    }

    #[test]
    fn test_device_record_with_na_power() {
        let text = "index, gpu_uuid, utilization.gpu [%], power.draw [W], power.max_limit [W]\n\
                    3, GPU-x, 12 %, [N/A], 250.00 W\n";
        let recs = parse_table(text).unwrap();
        let dev = DeviceRecord::try_from(&recs[0]).unwrap();
        assert_eq!(dev.index, "3");
        assert_eq!(dev.utilization, Some(12.0));
        assert_eq!(dev.power_draw, None);
        assert_eq!(dev.power_limit, Some(250.0));
    }

    #[test]
    fn test_device_record_rejects_unannotated_power() {
        // Without the unit annotation the cell stays text; that is format drift.
        let text = "index, gpu_uuid, utilization.gpu [%], power.draw, power.max_limit [W]\n\
                    0, GPU-x, 12 %, 100 W, 250.00 W\n";
        let recs = parse_table(text).unwrap();
        let err = DeviceRecord::try_from(&recs[0]).unwrap_err();
        assert!(matches!(err, MalformedTableError::InvalidValue { .. }));
    }
}
