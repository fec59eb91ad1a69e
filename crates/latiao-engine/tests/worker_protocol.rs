//! The worker protocol as hosts see it: JSON in, JSON out.

use latiao_engine::worker::router::parse_request;
use latiao_engine::{Config, ProgramStore, Worker, route_json};
use serde_json::{Value, json};

fn send(store: &ProgramStore, message: Value) -> Value {
    serde_json::from_str(&route_json(store, &message.to_string())).unwrap()
}

#[test]
fn test_program_lifecycle_over_json() {
    let store = ProgramStore::new(Config::default()).unwrap();

    let created = send(
        &store,
        json!({
            "task": "createProgram",
            "data": [{ "fid": "price", "name": "Price", "mode": "group", "data": [1, 2, null, 100] }]
        }),
    );
    assert_eq!(created["success"], json!(true));
    let program_id = created["data"]["programId"].clone();

    let executed = send(
        &store,
        json!({
            "task": "execute",
            "programId": program_id,
            "source": "out clean = $zeroFill(Price), out $log(clean, 10)"
        }),
    );
    assert_eq!(executed["success"], json!(true), "{executed}");
    let data = &executed["data"];
    assert_eq!(data["columns"][0], json!([1.0, 2.0, 0.0, 100.0]));
    // log10(0) is -Infinity, which JSON carries as null.
    assert_eq!(data["columns"][1][2], Value::Null);
    assert!((data["columns"][1][3].as_f64().unwrap() - 2.0).abs() < 1e-12);

    let clean = &data["enter"][0];
    assert_eq!(clean["name"], json!("clean"));
    assert_eq!(clean["mode"], json!("vec"));
    assert_eq!(clean["out"], json!(true));
    assert_eq!(clean["extInfo"]["extOpt"], json!("LaTiao.$zeroFill"));
    assert_eq!(clean["extInfo"]["extFrom"], json!(["price"]));
    let clean_fid = clean["fid"].as_str().unwrap();
    assert!(!clean_fid.starts_with("lt_"));
    assert_eq!(data["enter"][1]["extInfo"]["extFrom"], json!([clean_fid]));

    let destroyed = send(&store, json!({ "task": "destroyProgram", "programId": program_id }));
    assert_eq!(destroyed, json!({ "success": true, "data": true }));

    let gone = send(
        &store,
        json!({ "task": "execute", "programId": program_id, "source": "out $id(Price)" }),
    );
    assert_eq!(gone["success"], json!(false));
}

#[test]
fn test_failures_are_messages() {
    let store = ProgramStore::new(Config::default()).unwrap();
    let created = send(
        &store,
        json!({ "task": "createProgram", "data": [{ "fid": "x", "name": "x", "mode": "vec", "data": [1] }] }),
    );
    let program_id = created["data"]["programId"].clone();

    let cases = [
        ("$zeroFill(x)", "SyntaxError"),
        ("out $normalize(nope)", "NameError"),
        ("out $normalize(x).Y", "TypeError"),
        ("out $map(x, 'd +')", "RuntimeError"),
    ];
    for (source, kind) in cases {
        let reply = send(&store, json!({ "task": "execute", "programId": program_id, "source": source }));
        assert_eq!(reply["success"], json!(false));
        let message = reply["message"].as_str().unwrap();
        assert!(message.starts_with(kind), "{source}: {message}");
    }

    let mismatched = send(
        &store,
        json!({
            "task": "createProgram",
            "data": [
                { "fid": "a", "name": "a", "mode": "vec", "data": [1, 2] },
                { "fid": "b", "name": "b", "mode": "vec", "data": [1] }
            ]
        }),
    );
    assert_eq!(mismatched["success"], json!(false));

    assert_eq!(
        send(&store, json!({ "task": "compile" })),
        json!({ "success": false, "message": "Unknown task: compile." })
    );
    assert!(parse_request(r#"{"task":"execute"}"#).is_err());
}

#[test]
fn test_empty_text_columns_over_json() {
    let store = ProgramStore::new(Config::default()).unwrap();
    let created = send(
        &store,
        json!({ "task": "createProgram", "data": [{ "fid": "city", "name": "city", "mode": "text", "data": [] }] }),
    );
    let program_id = created["data"]["programId"].clone();
    let reply = send(
        &store,
        json!({ "task": "execute", "programId": program_id, "source": "out $concat(city, city)" }),
    );
    assert_eq!(reply["success"], json!(true), "{reply}");
    assert_eq!(reply["data"]["columns"][0], json!([]));
}

#[test]
fn test_worker_serves_blocking_clients() {
    let worker = Worker::spawn(ProgramStore::new(Config::default()).unwrap()).unwrap();
    let request = parse_request(
        &json!({
            "task": "createProgram",
            "data": [{ "fid": "t", "name": "t", "mode": "text", "data": ["a", "b"] }]
        })
        .to_string(),
    )
    .unwrap();
    let reply = serde_json::to_value(worker.request_blocking(request).unwrap()).unwrap();
    assert_eq!(reply["success"], json!(true));
}
