//! Start/stop ordering, fault policy, and service accessors.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use silo_core::{DataStore, DateTimeProvider, ErrorCode, FixedClock, SiloError};
use silo_host::config::AppConfig;
use silo_host::lifecycle::{AppBuilder, Phase};
use silo_host::{bootstrap, keys};

type Trace = Arc<Mutex<Vec<&'static str>>>;

fn record(trace: &Trace, name: &'static str) -> impl Fn() -> silo_core::Result<()> {
    let trace = Arc::clone(trace);
    move || {
        trace.lock().unwrap().push(name);
        Ok(())
    }
}

#[test]
fn start_callbacks_run_in_registration_order() {
    let trace: Trace = Arc::default();
    let app = AppBuilder::new(DataStore::new())
        .on_start("a", record(&trace, "a"))
        .on_start("b", record(&trace, "b"))
        .on_start("c", record(&trace, "c"))
        .build();

    app.started().unwrap();
    assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(app.phase(), Phase::Started);
    assert!(app.is_ready());
}

#[test]
fn start_fault_aborts_remaining_callbacks() {
    let trace: Trace = Arc::default();
    let app = AppBuilder::new(DataStore::new())
        .on_start("a", record(&trace, "a"))
        .on_start("b", || Err(SiloError::Internal("db unreachable".into())))
        .on_start("c", record(&trace, "c"))
        .build();

    let err = app.started().expect_err("must fail");
    match &err {
        SiloError::StartupFault { callback, .. } => assert_eq!(callback, "b"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*trace.lock().unwrap(), vec!["a"]);
    assert_eq!(app.phase(), Phase::Failed);
    assert!(!app.is_ready());
}

#[test]
fn start_panic_is_reported_as_fault() {
    let app = AppBuilder::new(DataStore::new())
        .on_start("boom", || panic!("bad wiring"))
        .build();

    let err = app.started().expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::StartupFault);
    assert!(err.to_string().contains("boom"));
}

#[test]
fn stop_callbacks_are_best_effort() {
    let trace: Trace = Arc::default();
    let app = AppBuilder::new(DataStore::new())
        .on_stop("a", record(&trace, "a"))
        .on_stop("b", || Err(SiloError::Internal("flush failed".into())))
        .on_stop("c", record(&trace, "c"))
        .build();

    app.started().unwrap();
    let report = app.stopping().unwrap();

    assert_eq!(*trace.lock().unwrap(), vec!["a", "c"]);
    assert_eq!(report.ran, 3);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].code(), ErrorCode::ShutdownFault);
    assert!(app.cancel_token().is_cancelled());

    app.stopped().unwrap();
    assert_eq!(app.phase(), Phase::Stopped);
}

#[test]
fn stop_panic_is_collected_and_later_callbacks_run() {
    let trace: Trace = Arc::default();
    let app = AppBuilder::new(DataStore::new())
        .on_stop("flush", || panic!("flush exploded"))
        .on_stop("close", record(&trace, "close"))
        .build();

    app.started().unwrap();
    let report = app.stopping().unwrap();

    assert_eq!(*trace.lock().unwrap(), vec!["close"]);
    assert_eq!(report.ran, 2);
    assert_eq!(report.faults.len(), 1);
    match &report.faults[0] {
        SiloError::ShutdownFault { callback, reason } => {
            assert_eq!(callback, "flush");
            assert!(reason.contains("flush exploded"), "{reason}");
        }
        other => panic!("unexpected fault: {other}"),
    }
    assert!(!report.is_clean());
}

#[test]
fn stopping_is_allowed_after_failed_start() {
    let stopped = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&stopped);
    let app = AppBuilder::new(DataStore::new())
        .on_start("fail", || Err(SiloError::Internal("nope".into())))
        .on_stop("release", move || {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    assert!(app.started().is_err());
    assert!(app.stopping().unwrap().is_clean());
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn lifecycle_calls_out_of_order_are_rejected() {
    let app = AppBuilder::new(DataStore::new()).build();

    assert_eq!(app.stopping().unwrap_err().code(), ErrorCode::InvalidPhase);
    assert_eq!(app.stopped().unwrap_err().code(), ErrorCode::InvalidPhase);

    app.started().unwrap();
    assert_eq!(app.started().unwrap_err().code(), ErrorCode::InvalidPhase);
}

#[test]
fn counter_reaches_two_after_start() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (c1, c2) = (Arc::clone(&counter), Arc::clone(&counter));
    let app = AppBuilder::new(DataStore::new())
        .on_start("inc", move || {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .on_start("inc", move || {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    app.started().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn accessors_report_missing_services() {
    let app = AppBuilder::new(DataStore::new()).build();

    for err in [
        app.date_time_provider().err().unwrap(),
        app.logger_factory().err().unwrap(),
        app.configuration().err().unwrap(),
        app.service_provider().err().unwrap(),
        app.background_job_manager().err().unwrap(),
        app.application_name().err().unwrap(),
    ] {
        assert_eq!(err.code(), ErrorCode::ServiceNotConfigured, "{err}");
    }
}

#[test]
fn accessor_on_wrong_type_is_type_mismatch() {
    let store = DataStore::new();
    store.set(keys::APPLICATION_NAME.name(), 42u32);
    let app = AppBuilder::new(store).build();

    assert_eq!(app.application_name().unwrap_err().code(), ErrorCode::TypeMismatch);
}

#[test]
fn bootstrap_populates_well_known_services() {
    let app = bootstrap::bootstrap(AppConfig::named("billing")).unwrap().build();

    assert_eq!(app.application_name().unwrap(), "billing");
    assert_eq!(app.configuration().unwrap().app.name, "billing");
    assert_eq!(app.logger("jobs").unwrap().category(), "billing::jobs");
    assert!(app.service_provider().unwrap().contains::<silo_host::JobManager>());
    assert!(app.background_job_manager().is_ok());
    assert!(app.date_time_provider().is_ok());
}

#[test]
fn store_entries_can_be_replaced_before_build() {
    let builder = bootstrap::bootstrap(AppConfig::named("billing")).unwrap();
    let t0 = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap();
    builder.store().put(
        &keys::DATE_TIME_PROVIDER,
        Arc::new(FixedClock::new(t0)) as Arc<dyn DateTimeProvider>,
    );
    let app = builder.build();

    assert_eq!(app.date_time_provider().unwrap().now(), t0);
}
