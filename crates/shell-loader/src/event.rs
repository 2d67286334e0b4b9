//! Outbound worker events.
//!
//! Events serialize to the JSON shapes the viewer consumes, tagged by
//! `"type"`. Within one worker they are delivered in emission order.

use serde::Serialize;
use shell_decode::{DecodedBuffers, ShellId};

/// Payload of a `shellLoad` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShellData {
    /// Dense buffers decoded from a JSON shell.
    Decoded(DecodedBuffers),
    /// Markup shell text, handed on without decoding.
    Markup(String),
}

/// A progress, result, or error report from a worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    /// Bytes are still arriving. `percent` is present only when the total
    /// length is known.
    LoadProgress {
        file: String,
        #[serde(rename = "loaded", skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },
    /// The fetch finished successfully.
    LoadComplete { file: String },
    /// The fetch failed (404 or transport error).
    LoadError {
        url: String,
        file: String,
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
    /// The fetch succeeded but the payload could not be parsed or decoded.
    PayloadError {
        url: String,
        file: String,
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
    /// Root assembly text.
    RootLoad {
        url: String,
        data: String,
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
    /// Annotation text.
    AnnotationLoad {
        url: String,
        file: String,
        data: String,
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
    /// One shell is ready.
    ShellLoad {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        file: String,
        data: ShellData,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<ShellId>,
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
    /// The payload was received and parsed; decoding starts next.
    ParseComplete { file: String },
    /// All shells for the current request have been delivered.
    WorkerFinish {
        #[serde(rename = "workerID")]
        worker_id: u32,
    },
}

impl WorkerEvent {
    /// True if this event ends the worker's current request.
    ///
    /// A worker slot may be given new work once a terminal event for its
    /// previous request has been observed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::LoadError { .. }
                | Self::PayloadError { .. }
                | Self::RootLoad { .. }
                | Self::AnnotationLoad { .. }
                | Self::WorkerFinish { .. }
        )
    }

    /// Wire name of this event's `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadProgress { .. } => "loadProgress",
            Self::LoadComplete { .. } => "loadComplete",
            Self::LoadError { .. } => "loadError",
            Self::PayloadError { .. } => "payloadError",
            Self::RootLoad { .. } => "rootLoad",
            Self::AnnotationLoad { .. } => "annotationLoad",
            Self::ShellLoad { .. } => "shellLoad",
            Self::ParseComplete { .. } => "parseComplete",
            Self::WorkerFinish { .. } => "workerFinish",
        }
    }
}

/// Final `/`-separated segment of a URL, used to identify files in events.
#[must_use]
pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// True if the URL's extension marks a markup (XML) payload.
#[must_use]
pub fn is_markup(url: &str) -> bool {
    url.rsplit('.')
        .next()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("http://host/models/a/shell_1.json"), "shell_1.json");
        assert_eq!(file_name("shell_1.json"), "shell_1.json");
        assert_eq!(file_name("http://host/dir/"), "");
    }

    #[test]
    fn test_is_markup() {
        assert!(is_markup("/a/b/shell.xml"));
        assert!(is_markup("/a/b/SHELL.XML"));
        assert!(!is_markup("/a/b/shell.json"));
        assert!(!is_markup("/a/b/xml"));
    }

    #[test]
    fn test_progress_serialization() {
        let known = WorkerEvent::LoadProgress {
            file: "a.json".to_string(),
            percent: Some(50.0),
        };
        assert_eq!(
            serde_json::to_value(&known).unwrap(),
            json!({"type": "loadProgress", "file": "a.json", "loaded": 50.0})
        );

        let unknown = WorkerEvent::LoadProgress {
            file: "a.json".to_string(),
            percent: None,
        };
        assert_eq!(
            serde_json::to_value(&unknown).unwrap(),
            json!({"type": "loadProgress", "file": "a.json"})
        );
    }

    #[test]
    fn test_shell_load_serialization() {
        let event = WorkerEvent::ShellLoad {
            url: Some("/x/s.json".to_string()),
            file: "s.json".to_string(),
            data: ShellData::Decoded(DecodedBuffers {
                position: vec![1.0, 2.0, 3.0],
                normal: vec![0.0, 0.0, 1.0],
                color: vec![],
            }),
            id: Some(ShellId::Text("s".to_string())),
            worker_id: 3,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "shellLoad",
                "url": "/x/s.json",
                "file": "s.json",
                "data": {"position": [1.0, 2.0, 3.0], "normal": [0.0, 0.0, 1.0], "colors": []},
                "id": "s",
                "workerID": 3
            })
        );
    }

    #[test]
    fn test_terminal_events() {
        assert!(WorkerEvent::WorkerFinish { worker_id: 0 }.is_terminal());
        assert!(
            WorkerEvent::LoadError {
                url: String::new(),
                file: String::new(),
                worker_id: 0
            }
            .is_terminal()
        );
        assert!(
            !WorkerEvent::ParseComplete {
                file: String::new()
            }
            .is_terminal()
        );
        assert!(
            !WorkerEvent::LoadComplete {
                file: String::new()
            }
            .is_terminal()
        );
    }
}
