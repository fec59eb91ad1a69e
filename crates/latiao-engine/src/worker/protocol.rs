//! Worker messages.
//!
//! Requests are tagged by `task`; responses are
//! `{"success": true, "data": ...}` or `{"success": false, "message": ...}`.

use latiao_common::types::{Column, ColumnData, FieldToken, ProgramId};
use latiao_common::utils::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A request to a program store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "camelCase")]
pub enum Request {
    /// Binds a column snapshot as a new program.
    CreateProgram {
        /// Origin columns.
        data: Vec<Column>,
    },
    /// Runs program text against a program.
    #[serde(rename_all = "camelCase")]
    Execute {
        /// Target program.
        program_id: ProgramId,
        /// LaTiao source.
        source: String,
    },
    /// Frees a program.
    #[serde(rename_all = "camelCase")]
    DestroyProgram {
        /// Target program.
        program_id: ProgramId,
    },
}

impl Request {
    /// Name of the task, as it appears on the wire.
    #[must_use]
    pub fn task(&self) -> &'static str {
        match self {
            Self::CreateProgram { .. } => "createProgram",
            Self::Execute { .. } => "execute",
            Self::DestroyProgram { .. } => "destroyProgram",
        }
    }
}

/// Payload of `createProgram`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramResult {
    /// Id of the new program.
    pub program_id: ProgramId,
}

/// Payload of `execute`.
///
/// `enter` and `columns` are the field tokens and row data of `data`, split
/// for hosts that keep metadata and rows apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Exported columns, in export order.
    pub data: Vec<Column>,
    /// Exported fields.
    pub enter: Vec<FieldToken>,
    /// Exported rows.
    pub columns: Vec<ColumnData>,
}

impl From<Vec<Column>> for ExecuteResult {
    fn from(data: Vec<Column>) -> Self {
        let enter = data.iter().map(|c| c.token.clone()).collect();
        let columns = data.iter().map(|c| c.data.clone()).collect();
        Self { data, enter, columns }
    }
}

/// Successful payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// `createProgram`.
    Created(CreateProgramResult),
    /// `execute`.
    Executed(ExecuteResult),
    /// `destroyProgram`.
    Destroyed(bool),
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The request succeeded.
    Success(ResponseData),
    /// The request failed; the message is the rendered error.
    Failure(String),
}

impl Response {
    /// Wraps a store result.
    pub fn from_result(result: Result<ResponseData>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(err) => Self::Failure(err.to_string()),
        }
    }

    /// Returns whether the request succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts back into a result, turning a failure into a runtime error.
    pub fn into_result(self) -> Result<ResponseData> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(message) => Err(Error::runtime(message)),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            Self::Failure(message) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("message", message)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use latiao_common::types::FieldMode;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req: Request = serde_json::from_value(json!({
            "task": "execute",
            "programId": 3,
            "source": "out $id(a)"
        }))
        .unwrap();
        assert_eq!(
            req,
            Request::Execute {
                program_id: ProgramId::new(3),
                source: "out $id(a)".into()
            }
        );
        assert_eq!(req.task(), "execute");

        let req: Request = serde_json::from_value(json!({
            "task": "createProgram",
            "data": [{ "fid": "a", "name": "a", "mode": "group", "data": [1, null] }]
        }))
        .unwrap();
        let Request::CreateProgram { data } = req else { panic!("expected createProgram") };
        assert_eq!(data[0].token.mode, FieldMode::Vec);
        assert!(data[0].data.as_numbers().unwrap()[1].is_nan());
    }

    #[test]
    fn test_response_wire_format() {
        let ok = Response::Success(ResponseData::Destroyed(true));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({ "success": true, "data": true }));

        let created = Response::Success(ResponseData::Created(CreateProgramResult {
            program_id: ProgramId::new(7),
        }));
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            json!({ "success": true, "data": { "programId": 7 } })
        );

        let err = Response::from_result(Err(Error::name("Cannot find program 9.")));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "success": false, "message": "NameError: Cannot find program 9." })
        );
    }

    #[test]
    fn test_execute_result_splits_columns() {
        let column = Column {
            token: FieldToken::origin("a", "a", FieldMode::Text),
            data: ColumnData::Texts(vec!["x".into()]),
        };
        let result = ExecuteResult::from(vec![column.clone()]);
        assert_eq!(result.enter, vec![column.token.clone()]);
        assert_eq!(result.columns, vec![column.data.clone()]);
        assert_eq!(result.data, vec![column]);
    }
}
