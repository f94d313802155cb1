//! End-to-end tests for `Client::list_machines` over a scripted HTTP agent.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Cursor;
use std::time::Duration;

use edgeapi::api::{
    Client, Credential, HttpAgent, HttpResponse, NetworkError, RetryPolicy, Session,
};
use edgeapi::common::{Error, Sink, Warning};

const VALID_BODY: &str = r#"{"computers":[{"cluster_name":"c1","cpu":"x86","hash":"abc","memory":1024,"nb_gpu":2,"price_per_hour":0.5,"region":"us","storage":100}]}"#;

#[derive(Default)]
struct Agent {
    responses: RefCell<VecDeque<(u16, String)>>,
    calls: RefCell<u32>,
}

impl Agent {
    fn new(responses: &[(u16, &str)]) -> Self {
        Self {
            responses: RefCell::new(
                responses
                    .iter()
                    .map(|(status, body)| (*status, body.to_string()))
                    .collect(),
            ),
            calls: RefCell::new(0),
        }
    }
}

impl HttpAgent for &Agent {
    fn get(
        &self,
        _url: &str,
        _headers: &[(&str, &str)],
        _timeout: Duration,
    ) -> Result<HttpResponse, NetworkError> {
        *self.calls.borrow_mut() += 1;
        let (status, body) = self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("more requests than scripted responses");
        Ok(HttpResponse {
            status,
            reason: String::new(),
            body: Box::new(Cursor::new(body.into_bytes())),
        })
    }
}

#[derive(Default)]
struct Recorder {
    warnings: RefCell<Vec<Warning>>,
}

impl Sink for Recorder {
    fn log(&self, _message: &str) {}

    fn warn(&self, warning: &Warning) {
        self.warnings.borrow_mut().push(warning.clone());
    }
}

fn client(agent: &Agent) -> Client<&Agent> {
    Client::new(
        Session::new(
            url::Url::parse("https://api.edge.test").unwrap(),
            Credential::new("test-key").unwrap(),
        ),
        agent,
        RetryPolicy {
            delay: Duration::ZERO,
            ..Default::default()
        },
        false,
    )
}

#[test]
fn single_valid_machine() {
    let agent = Agent::new(&[(200, VALID_BODY)]);
    let sink = Recorder::default();
    let result = client(&agent).list_machines(&sink).unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.valid, 1);
    assert_eq!(result.invalid, 0);
    let machine = &result.machines[0];
    assert_eq!(machine.cluster_name, "c1");
    assert_eq!(machine.cpu, "x86");
    assert_eq!(machine.hash, "abc");
    assert_eq!(machine.memory, 1024);
    assert_eq!(machine.gpus, 2);
    assert_eq!(machine.price_per_hour, 0.5);
    assert_eq!(machine.region, "us");
    assert_eq!(machine.storage, 100);
    assert!(sink.warnings.borrow().is_empty());
}

#[test]
fn extra_key_rejects_the_record() {
    let body = VALID_BODY.replace(r#""storage":100}"#, r#""storage":100,"extra_key":"z"}"#);
    let agent = Agent::new(&[(200, body.as_str())]);
    let sink = Recorder::default();
    let result = client(&agent).list_machines(&sink).unwrap();

    assert!(result.machines.is_empty());
    assert_eq!(result.total, 1);
    assert_eq!(result.valid, 0);
    assert_eq!(result.invalid, 1);
    assert_eq!(result.unexpected_fields, 1);
    assert_eq!(result.rejected[0].unexpected, ["extra_key"]);

    let warnings = sink.warnings.borrow();
    assert!(warnings.contains(&Warning::UnexpectedFields {
        index: 0,
        fields: vec!["extra_key".into()],
    }));
    assert!(matches!(
        warnings.last(),
        Some(Warning::SchemaMismatch { invalid: 1, total: 1, .. })
    ));
}

#[test]
fn empty_list_is_success() {
    let agent = Agent::new(&[(200, r#"{"computers":[]}"#)]);
    let result = client(&agent).list_machines(&Recorder::default()).unwrap();
    assert_eq!(result.total, 0);
    assert!(result.machines.is_empty());
}

#[test]
fn partial_batch_keeps_good_records() {
    let body = r#"{"computers":[
        {"cluster_name":"c1","cpu":"x86","hash":"a","memory":1024,"nb_gpu":2,"price_per_hour":0.5,"region":"us","storage":100},
        {"cluster_name":"c2","cpu":"x86","hash":"b","memory":2048,"nb_gpu":0,"price_per_hour":0.7,"region":"eu","storage":200},
        {"cluster_name":"c3","cpu":"arm","hash":"c","memory":4096,"nb_gpu":1,"price_per_hour":1.5,"region":"ap","storage":300,"zone":"z","ipv6":true},
        {"cluster_name":"c4","cpu":"arm","hash":"d","memory":4096,"nb_gpu":1,"price_per_hour":1.5,"region":"ap","storage":300}
    ]}"#;
    let agent = Agent::new(&[(200, body)]);
    let result = client(&agent).list_machines(&Recorder::default()).unwrap();

    let names: Vec<_> = result.machines.iter().map(|m| m.cluster_name.as_str()).collect();
    assert_eq!(names, ["c1", "c4"]);
    assert_eq!((result.total, result.valid, result.invalid), (4, 2, 2));
    assert_eq!(result.missing_fields, 1);
    assert_eq!(result.unexpected_fields, 1);
    // A real zero GPU count is indistinguishable from an absent one.
    assert_eq!(result.rejected[0].missing, ["nb_gpu"]);
    assert_eq!(result.rejected[1].unexpected, ["ipv6", "zone"]);
}

#[test]
fn null_record_is_rejected_without_failing_the_batch() {
    let body = VALID_BODY.replace("}]}", "},null]}");
    let agent = Agent::new(&[(200, body.as_str())]);
    let result = client(&agent).list_machines(&Recorder::default()).unwrap();

    assert_eq!((result.total, result.valid, result.invalid), (2, 1, 1));
    assert_eq!(result.machines[0].cluster_name, "c1");
    assert_eq!(result.missing_fields, 1);
    assert_eq!(
        result.rejected[0].missing,
        ["cluster_name", "cpu", "hash", "memory", "nb_gpu", "price_per_hour", "region", "storage"]
    );
    assert!(result.rejected[0].unexpected.is_empty());
}

#[test]
fn truncated_body_is_a_decode_failure() {
    let agent = Agent::new(&[(200, &VALID_BODY[..VALID_BODY.len() - 5])]);
    let err = client(&agent).list_machines(&Recorder::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedJson { .. }), "{err:?}");
    assert_eq!(*agent.calls.borrow(), 1);
}

#[test]
fn recovers_from_two_bad_gateways() {
    let agent = Agent::new(&[(502, ""), (502, ""), (200, VALID_BODY)]);
    let result = client(&agent).list_machines(&Recorder::default()).unwrap();
    assert_eq!(result.valid, 1);
    assert_eq!(*agent.calls.borrow(), 3);
}

#[test]
fn three_unavailable_responses_report_503() {
    let agent = Agent::new(&[(503, ""), (503, ""), (503, "")]);
    let err = client(&agent).list_machines(&Recorder::default()).unwrap_err();
    assert!(matches!(err, Error::ServerUnavailable { status: 503, .. }), "{err:?}");
    assert!(err.to_string().contains("503"));
    assert_eq!(*agent.calls.borrow(), 3);
}

#[test]
fn unauthorized_is_not_retried() {
    let agent = Agent::new(&[(401, ""), (200, VALID_BODY)]);
    let err = client(&agent).list_machines(&Recorder::default()).unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(err.kind(), "unauthorized");
    assert_eq!(*agent.calls.borrow(), 1);
}
