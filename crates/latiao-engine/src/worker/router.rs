//! JSON message routing.

use serde_json::Value;

use super::protocol::{Request, Response};
use super::store::ProgramStore;

/// Parses a JSON request, serves it and renders the JSON response.
///
/// Malformed messages and unknown tasks produce a failure response rather
/// than an error.
pub fn route_json(store: &ProgramStore, message: &str) -> String {
    let response = match parse_request(message) {
        Ok(request) => store.handle(request),
        Err(message) => Response::Failure(message),
    };
    render(&response)
}

/// Decodes a request, naming the task when it is not one the store knows.
pub fn parse_request(message: &str) -> Result<Request, String> {
    let value: Value = serde_json::from_str(message).map_err(|e| format!("Malformed message: {e}."))?;
    let task = match value.get("task") {
        Some(Value::String(task)) => task.clone(),
        Some(other) => return Err(format!("Unknown task: {other}.")),
        None => return Err("Missing task.".to_string()),
    };
    if !matches!(task.as_str(), "createProgram" | "execute" | "destroyProgram") {
        return Err(format!("Unknown task: {task}."));
    }
    serde_json::from_value(value).map_err(|e| format!("Malformed {task} message: {e}."))
}

/// Renders a response as JSON.
pub fn render(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        serde_json::json!({ "success": false, "message": format!("Cannot encode response: {e}.") }).to_string()
    })
}
