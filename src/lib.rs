pub mod announce;
pub mod config;
pub mod history;
pub mod models;
pub mod reminder;
pub mod scan;

pub use announce::{Announcement, Announcer, RecordingAnnouncer, TracingAnnouncer};
pub use history::{HistoryError, HistoryStatus, HistoryStore, MedicineHistory};
pub use reminder::{ReminderDraft, ReminderSink, ReminderValidation};
pub use scan::{FlowConfig, MockOcr, OcrCollaborator, ScanError, ScanFlow, ScanImage, ScanOutcome};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
/// `RUST_LOG` wins over [`config::default_log_filter`]. A second call is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanSource;
    use std::sync::Arc;

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }

    #[tokio::test]
    async fn scan_persists_across_flows_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let kv = history::FileKv::open(dir.path()).unwrap();

        let flow = ScanFlow::new(
            MockOcr::canned(),
            history::KeyValueHistoryStore::new(kv.clone()),
            TracingAnnouncer,
            FlowConfig::default(),
        );
        flow.mount().unwrap();
        flow.submit(ScanImage::new(ScanSource::Camera, vec![1, 2, 3]))
            .await
            .unwrap();
        flow.unmount();

        let announcer = Arc::new(RecordingAnnouncer::new());
        let reopened = ScanFlow::new(
            MockOcr::canned(),
            history::KeyValueHistoryStore::new(kv),
            announcer.clone(),
            FlowConfig::default(),
        );
        assert_eq!(reopened.mount().unwrap(), HistoryStatus::Loaded(1));
        assert_eq!(
            announcer.last().unwrap().text,
            "1 medicine found in your scan history"
        );
        assert_eq!(reopened.history_entries().unwrap()[0].name, "Paracetamol");
    }
}
