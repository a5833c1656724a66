use async_trait::async_trait;
use memwarden::alerts::AlertCenter;
use memwarden::cleanup::EmergencyCleanup;
use memwarden::config::MemwardenConfig;
use memwarden::events::{EventBus, MemoryEvent};
use memwarden::lifecycle::{ModelLifecycleController, ModelUnloader};
use memwarden::models::{AlertLevel, ModelMemoryInfo, ResourceCategory, SystemMemoryInfo};
use memwarden::monitor::{GcHook, MemoryMonitor, MemoryProbe, ProbeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const GIB: u64 = 1024 * 1024 * 1024;
const TOTAL: u64 = 100 * GIB;

#[derive(Debug)]
struct FixedProbe {
    used: u64,
}

#[async_trait]
impl MemoryProbe for FixedProbe {
    async fn sample(&self) -> Result<SystemMemoryInfo, ProbeError> {
        Ok(SystemMemoryInfo::new(TOTAL, self.used, "test"))
    }
}

#[derive(Debug)]
struct ScriptedUnloader {
    results: Mutex<Vec<Result<(), String>>>,
}

#[async_trait]
impl ModelUnloader for ScriptedUnloader {
    async fn unload(&self, _model_id: &str) -> Result<(), String> {
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok(())
        } else {
            results.remove(0)
        }
    }
}

#[derive(Debug, Default)]
struct RecordingGc {
    triggered: AtomicBool,
}

#[async_trait]
impl GcHook for RecordingGc {
    fn is_available(&self) -> bool {
        true
    }

    async fn trigger(&self) -> Result<(), String> {
        self.triggered.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    cleanup: EmergencyCleanup,
    lifecycle: Arc<ModelLifecycleController>,
    alerts: Arc<AlertCenter>,
    gc: Arc<RecordingGc>,
    rx: broadcast::Receiver<MemoryEvent>,
}

fn harness(resample_used: u64, unload_results: Vec<Result<(), String>>) -> Harness {
    let config = MemwardenConfig::default();
    let events = EventBus::new(64);
    let rx = events.subscribe();
    let monitor = Arc::new(MemoryMonitor::new(Arc::new(FixedProbe {
        used: resample_used,
    })));
    let lifecycle = Arc::new(ModelLifecycleController::new(
        Arc::new(ScriptedUnloader {
            results: Mutex::new(unload_results),
        }),
        config.eviction.clone(),
    ));
    let alerts = Arc::new(AlertCenter::new(events.clone()));
    let gc = Arc::new(RecordingGc::default());
    let cleanup = EmergencyCleanup::new(
        monitor,
        lifecycle.clone(),
        gc.clone(),
        alerts.clone(),
        events,
        config.thresholds,
        config.eviction,
    );

    Harness {
        cleanup,
        lifecycle,
        alerts,
        gc,
        rx,
    }
}

fn emergency_sample() -> SystemMemoryInfo {
    SystemMemoryInfo::new(TOTAL, 96 * GIB, "test")
}

#[tokio::test]
async fn test_successful_cleanup_unloads_and_reports_savings() {
    // Usage at 96% with one unloadable model worth 2 GiB; the re-sample
    // lands at 86%, below the critical threshold.
    let mut h = harness(86 * GIB, vec![]);
    h.lifecycle
        .register_model(ModelMemoryInfo::new("llama-13b", 2 * GIB));

    let outcome = h
        .cleanup
        .run(ResourceCategory::System, &emergency_sample())
        .await;

    assert!(outcome.completed);
    assert!(outcome.memory_saved_bytes >= 2 * GIB);
    assert!(h.lifecycle.get("llama-13b").is_none());
    assert!(h.gc.triggered.load(Ordering::SeqCst));
    assert!(
        outcome
            .actions_taken
            .iter()
            .any(|a| a.contains("llama-13b"))
    );
    assert!(
        outcome
            .actions_taken
            .iter()
            .any(|a| a.contains("garbage collection"))
    );

    let resample = outcome.resample.expect("re-sample should be present");
    assert!(resample.usage_percentage < 87.5);

    // The completion event fires with the measured savings
    let mut saw_completion = false;
    while let Ok(event) = h.rx.try_recv() {
        if let MemoryEvent::EmergencyCleanupCompleted {
            memory_saved_bytes,
            actions_taken,
        } = event
        {
            saw_completion = true;
            assert!(memory_saved_bytes >= 2 * GIB);
            assert!(!actions_taken.is_empty());
        }
    }
    assert!(saw_completion);
}

#[tokio::test]
async fn test_partial_failure_keeps_completed_steps_and_alerts() {
    // First unload fails, second succeeds; cleanup must continue past the
    // failure, keep the successful step, and document the partial failure
    // with a critical alert.
    let mut h = harness(
        86 * GIB,
        vec![Err("engine hung".to_string()), Ok(())],
    );
    h.lifecycle
        .register_model(ModelMemoryInfo::new("stuck", 6 * GIB).with_priority(1));
    h.lifecycle
        .register_model(ModelMemoryInfo::new("spare", 6 * GIB).with_priority(2));

    let outcome = h
        .cleanup
        .run(ResourceCategory::System, &emergency_sample())
        .await;

    assert!(!outcome.completed);
    assert!(outcome.actions_taken.iter().any(|a| a.contains("spare")));
    assert!(h.lifecycle.get("stuck").is_some());
    assert!(h.lifecycle.get("spare").is_none());

    let critical: Vec<_> = h
        .alerts
        .active_alerts()
        .into_iter()
        .filter(|a| a.level == AlertLevel::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert!(critical[0].message.contains("engine hung"));
    assert!(critical[0].message.contains("spare"));

    // The completion event still fires on a partial pass
    let mut saw_completion = false;
    while let Ok(event) = h.rx.try_recv() {
        if matches!(event, MemoryEvent::EmergencyCleanupCompleted { .. }) {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}

#[tokio::test]
async fn test_cleanup_without_candidates_still_resamples() {
    let mut h = harness(86 * GIB, vec![]);

    let outcome = h
        .cleanup
        .run(ResourceCategory::System, &emergency_sample())
        .await;

    assert!(outcome.completed);
    assert!(outcome.resample.is_some());
    // GC is the only reclamation step that could run
    assert!(h.gc.triggered.load(Ordering::SeqCst));

    let mut saw_completion = false;
    while let Ok(event) = h.rx.try_recv() {
        saw_completion |= matches!(event, MemoryEvent::EmergencyCleanupCompleted { .. });
    }
    assert!(saw_completion);
}
