use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// RTCStatsReport maps stats object ids to their JSON form, as produced by
/// the native engine (`{"id": .., "type": .., "timestamp": .., ...}`).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RTCStatsReport {
    pub reports: HashMap<String, Value>,
}

impl Serialize for RTCStatsReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.reports.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RTCStatsReport {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let root = value
            .as_object()
            .ok_or(serde::de::Error::custom("root object missing"))?;

        let mut reports = HashMap::new();
        for (key, value) in root {
            if !value.is_object() {
                return Err(serde::de::Error::custom(format!(
                    "stats entry {key} is not an object: {value}"
                )));
            }
            reports.insert(key.clone(), value.clone());
        }
        Ok(Self { reports })
    }
}

impl RTCStatsReport {
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.reports.get(id)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Flattens the report into the legacy callback form, sorted by id.
    pub fn to_legacy(&self) -> Vec<RTCLegacyStatsReport> {
        let mut legacy: Vec<RTCLegacyStatsReport> = self
            .reports
            .iter()
            .map(|(id, value)| RTCLegacyStatsReport::new(id, value))
            .collect();
        legacy.sort_by(|a, b| a.id.cmp(&b.id));
        legacy
    }
}

/// One entry of the legacy stats callback: the fixed members plus every
/// other member as a string.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RTCLegacyStatsReport {
    pub id: String,
    pub typ: String,
    pub timestamp: f64,
    stats: BTreeMap<String, String>,
}

impl RTCLegacyStatsReport {
    fn new(id: &str, value: &Value) -> Self {
        let mut report = RTCLegacyStatsReport {
            id: id.to_owned(),
            ..Default::default()
        };

        let Some(fields) = value.as_object() else {
            return report;
        };
        for (name, field) in fields {
            match name.as_str() {
                "id" => {}
                "type" => report.typ = field.as_str().unwrap_or_default().to_owned(),
                "timestamp" => report.timestamp = field.as_f64().unwrap_or_default(),
                _ => {
                    let stat = match field {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    report.stats.insert(name.clone(), stat);
                }
            }
        }

        report
    }

    /// names lists the stat names other than id, type and timestamp.
    pub fn names(&self) -> Vec<&str> {
        self.stats.keys().map(String::as_str).collect()
    }

    pub fn stat(&self, name: &str) -> Option<&str> {
        self.stats.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stats_report_from_json() {
        let report: RTCStatsReport = serde_json::from_str(
            r#"{
                "PC": {"id": "PC", "type": "peer-connection", "timestamp": 12.5, "dataChannelsOpened": 1},
                "T1": {"id": "T1", "type": "transport", "timestamp": 12.5, "iceRole": "controlling"}
            }"#,
        )
        .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report.get("PC").unwrap()["dataChannelsOpened"], 1);

        let legacy = report.to_legacy();
        assert_eq!(legacy.len(), 2);
        assert_eq!(legacy[0].id, "PC");
        assert_eq!(legacy[0].typ, "peer-connection");
        assert_eq!(legacy[0].timestamp, 12.5);
        assert_eq!(legacy[0].names(), vec!["dataChannelsOpened"]);
        assert_eq!(legacy[0].stat("dataChannelsOpened"), Some("1"));
        assert_eq!(legacy[1].stat("iceRole"), Some("controlling"));
        assert_eq!(legacy[1].stat("missing"), None);
    }

    #[test]
    fn test_stats_report_rejects_non_objects() {
        assert!(serde_json::from_str::<RTCStatsReport>("[]").is_err());
        assert!(serde_json::from_str::<RTCStatsReport>(r#"{"a": 1}"#).is_err());
    }
}
