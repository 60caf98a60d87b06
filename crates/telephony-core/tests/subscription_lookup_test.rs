//! Subscription lookup: injected reachability predicate, sink delivery and
//! error wrapping

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_test::traced_test;

use rvoip_telephony_core::{
    CallPredicate, Handle, LookupError, OneshotResponse, Response, ServiceConfig, Subscription,
    TelephonyConnectionService,
};

#[derive(Default)]
struct RecordingLookup {
    results: Mutex<Vec<(Handle, Option<Subscription>)>>,
    errors: Mutex<Vec<(Handle, LookupError)>>,
}

impl Response<Handle, Option<Subscription>, LookupError> for RecordingLookup {
    fn on_result(&self, request: &Handle, result: Option<Subscription>) {
        self.results.lock().push((request.clone(), result));
    }

    fn on_error(&self, request: &Handle, error: LookupError) {
        self.errors.lock().push((request.clone(), error));
    }
}

struct TelOnly;

impl CallPredicate for TelOnly {
    fn can_call(&self, handle: &Handle) -> anyhow::Result<bool> {
        Ok(handle.scheme() == "tel")
    }
}

#[test]
fn test_reachable_handle_gets_subscription() {
    let service = TelephonyConnectionService::builder()
        .config(ServiceConfig::new().with_subscription_label("SIM1"))
        .call_predicate(Arc::new(TelOnly))
        .build()
        .unwrap();
    let response = RecordingLookup::default();
    let handle = Handle::tel("555-1234");

    service.find_subscriptions(&handle, &response);

    let results = response.results.lock();
    assert_eq!(results.len(), 1);
    assert!(response.errors.lock().is_empty());
    assert_eq!(results[0].0, handle);
    assert_eq!(results[0].1.as_ref().and_then(|s| s.label.as_deref()), Some("SIM1"));
}

#[test]
fn test_unreachable_handle_gets_none() {
    let service = TelephonyConnectionService::builder()
        .call_predicate(Arc::new(TelOnly))
        .build()
        .unwrap();
    let response = RecordingLookup::default();

    service.find_subscriptions(&"sip:alice@example.com".parse().unwrap(), &response);

    let results = response.results.lock();
    assert_eq!(results.len(), 1);
    assert!(results[0].1.is_none());
}

#[test]
fn test_predicate_failure_is_reported_not_propagated() {
    let service = TelephonyConnectionService::builder()
        .can_call(|_handle| Err(anyhow::anyhow!("radio is off")))
        .build()
        .unwrap();
    let response = RecordingLookup::default();

    service.find_subscriptions(&Handle::tel("555"), &response);

    assert!(response.results.lock().is_empty());
    let errors = response.errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].1.to_string(), "Subscription lookup failed: radio is off");
}

#[test]
fn test_predicate_sees_the_handle() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let service = TelephonyConnectionService::builder()
        .can_call(move |handle| {
            record.lock().push(handle.to_string());
            Ok(true)
        })
        .build()
        .unwrap();

    assert!(service.find_subscription(&Handle::tel("911")).unwrap().is_some());
    assert_eq!(seen.lock().as_slice(), ["tel:911"]);
}

#[tokio::test]
async fn test_oneshot_lookup() {
    let service = TelephonyConnectionService::builder().build().unwrap();
    let (sink, outcome) = OneshotResponse::<Option<Subscription>, LookupError>::channel();

    service.find_subscriptions(&Handle::tel(""), &sink);

    assert_eq!(outcome.await.unwrap(), Ok(None));
}

#[test]
#[traced_test]
fn test_lookup_error_is_logged() {
    let service = TelephonyConnectionService::builder()
        .can_call(|_handle| Err(anyhow::anyhow!("modem reset")))
        .build()
        .unwrap();
    let response = RecordingLookup::default();

    service.find_subscriptions(&Handle::tel("555"), &response);

    assert!(logs_contain("response_error tel:555"));
    assert!(logs_contain("modem reset"));
}
