//! Azkaban AJAX API session.
//!
//! | operation        | request                                                   |
//! |------------------|-----------------------------------------------------------|
//! | login            | `POST /` `action=login`                                   |
//! | list projects    | `GET /index?ajax=fetchuserprojects`                       |
//! | create project   | `POST /manager?action=create`                             |
//! | upload           | `POST /manager` multipart, `ajax=upload`                  |
//! | project id       | `GET /manager?ajax=fetchprojectflows`                     |
//! | fetch schedule   | `GET /schedule?ajax=fetchSchedule`                        |
//! | schedule         | `POST /schedule` `ajax=scheduleCronFlow`                  |
//! | unschedule       | `POST /schedule` `action=removeSched`                     |
//!
//! Azkaban reports most failures inside a 200 response, either as an `error`
//! field or as `status: error` with a `message`.

use std::collections::BTreeSet;

use reqwest::blocking::multipart::{Form, Part};
use serde_json::Value;

use crate::alias::{Credentials, RemoteTarget};
use crate::error::{classify, RemoteError};
use crate::session::{Schedule, Session};

const SESSION_PARAM: &str = "session.id";

/// An authenticated Azkaban session.
///
/// Form and query calls go through the `ureq` agent; the archive upload is a
/// `multipart/form-data` request sent with a `reqwest` blocking client.
#[derive(Debug, Clone)]
pub struct AzkabanSession {
    agent: ureq::Agent,
    uploader: reqwest::blocking::Client,
    base_url: String,
    session_id: String,
}

impl AzkabanSession {
    /// Log in to `target` and keep the returned session id.
    pub fn login(target: &RemoteTarget, credentials: &Credentials) -> Result<Self, RemoteError> {
        const ACTION: &str = "login";
        let agent = ureq::AgentBuilder::new().build();
        let response = agent.post(&format!("{}/", target.url)).send_form(&[
            ("action", "login"),
            ("username", credentials.user.as_str()),
            ("password", credentials.password.as_str()),
        ]);
        let body = read_json(ACTION, response)?;
        let session_id = str_field(&body, SESSION_PARAM)
            .ok_or_else(|| decode_err(ACTION, "missing session.id"))?;
        let uploader = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| transport_err(ACTION, e))?;
        tracing::info!("logged in to {} as {}", target.url, credentials.user);
        Ok(Self {
            agent,
            uploader,
            base_url: target.url.clone(),
            session_id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn get(
        &self,
        action: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, RemoteError> {
        let mut request = self
            .agent
            .get(&self.endpoint(path))
            .query(SESSION_PARAM, self.session_id.as_str());
        for (key, value) in query {
            request = request.query(key, value);
        }
        read_json(action, request.call())
    }

    fn post_form(
        &self,
        action: &'static str,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, RemoteError> {
        let mut fields = vec![(SESSION_PARAM, self.session_id.as_str())];
        fields.extend_from_slice(form);
        read_json(action, self.agent.post(&self.endpoint(path)).send_form(&fields))
    }

    fn project_id(&self, project: &str) -> Result<String, RemoteError> {
        const ACTION: &str = "fetch project flows";
        let body = self.get(
            ACTION,
            "manager",
            &[("ajax", "fetchprojectflows"), ("project", project)],
        )?;
        match body.get("projectId") {
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(decode_err(ACTION, "missing projectId")),
        }
    }
}

impl Session for AzkabanSession {
    fn list_projects(&self) -> Result<BTreeSet<String>, RemoteError> {
        let body = self.get("list projects", "index", &[("ajax", "fetchuserprojects")])?;
        Ok(parse_projects(&body))
    }

    fn create_project(&self, name: &str, description: &str) -> Result<(), RemoteError> {
        self.post_form(
            "create project",
            "manager?action=create",
            &[("name", name), ("description", description)],
        )?;
        Ok(())
    }

    fn upload_project(
        &self,
        name: &str,
        file_name: &str,
        archive: &[u8],
    ) -> Result<(), RemoteError> {
        const ACTION: &str = "upload project";
        let file = Part::bytes(archive.to_vec())
            .file_name(file_name.to_owned())
            .mime_str("application/zip")
            .map_err(|e| transport_err(ACTION, e))?;
        let form = Form::new()
            .text("ajax", "upload")
            .text(SESSION_PARAM, self.session_id.clone())
            .text("project", name.to_owned())
            .part("file", file);

        let response = self
            .uploader
            .post(self.endpoint("manager"))
            .multipart(form)
            .send()
            .map_err(|e| transport_err(ACTION, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(RemoteError::Api {
                action: ACTION,
                message: format!("HTTP {}: {}", status.as_u16(), text.trim()),
            });
        }
        let body: Value = response
            .json()
            .map_err(|e| decode_err(ACTION, e.to_string()))?;
        check_response(ACTION, body)?;
        Ok(())
    }

    fn get_schedule(&self, project: &str, flow: &str) -> Result<Schedule, RemoteError> {
        let project_id = self.project_id(project)?;
        let body = self.get(
            "fetch schedule",
            "schedule",
            &[
                ("ajax", "fetchSchedule"),
                ("projectId", project_id.as_str()),
                ("flowId", flow),
            ],
        )?;
        parse_schedule(&body)
    }

    fn schedule_cron(&self, project: &str, flow: &str, cron: &str) -> Result<(), RemoteError> {
        self.post_form(
            "schedule flow",
            "schedule",
            &[
                ("ajax", "scheduleCronFlow"),
                ("projectName", project),
                ("flow", flow),
                ("cronExpression", cron),
            ],
        )?;
        Ok(())
    }

    fn unschedule(&self, project: &str, flow: &str) -> Result<(), RemoteError> {
        const ACTION: &str = "unschedule flow";
        let schedule = self.get_schedule(project, flow)?;
        let id = schedule
            .id
            .ok_or_else(|| decode_err(ACTION, "schedule has no scheduleId"))?;
        self.post_form(
            ACTION,
            "schedule",
            &[("action", "removeSched"), ("scheduleId", id.as_str())],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

fn read_json(
    action: &'static str,
    response: Result<ureq::Response, ureq::Error>,
) -> Result<Value, RemoteError> {
    match response {
        Ok(resp) => {
            let body: Value = resp
                .into_json()
                .map_err(|e| decode_err(action, e.to_string()))?;
            check_response(action, body)
        }
        Err(ureq::Error::Status(code, resp)) => {
            let text = resp.into_string().unwrap_or_default();
            Err(RemoteError::Api {
                action,
                message: format!("HTTP {code}: {}", text.trim()),
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport {
            action,
            message: transport.to_string(),
        }),
    }
}

/// Turn an in-band Azkaban error into a [`RemoteError`].
pub(crate) fn check_response(action: &'static str, body: Value) -> Result<Value, RemoteError> {
    if let Some(error) = str_field(&body, "error") {
        return Err(classify(action, error));
    }
    if str_field(&body, "status").as_deref() == Some("error") {
        let message = str_field(&body, "message").unwrap_or_else(|| "unknown error".into());
        return Err(classify(action, message));
    }
    Ok(body)
}

pub(crate) fn parse_projects(body: &Value) -> BTreeSet<String> {
    body.get("projects")
        .and_then(Value::as_array)
        .map(|projects| {
            projects
                .iter()
                .filter_map(|p| str_field(p, "projectName"))
                .collect()
        })
        .unwrap_or_default()
}

/// An empty response means the flow has no schedule.
pub(crate) fn parse_schedule(body: &Value) -> Result<Schedule, RemoteError> {
    let schedule = body
        .get("schedule")
        .filter(|s| s.is_object())
        .ok_or_else(|| RemoteError::NotFound {
            action: "fetch schedule",
            message: "flow has no schedule".into(),
        })?;
    Ok(Schedule {
        id: str_field(schedule, "scheduleId"),
        cron_expression: str_field(schedule, "cronExpression"),
    })
}

/// String or number field as text.
fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_err(action: &'static str, message: impl Into<String>) -> RemoteError {
    RemoteError::Decode {
        action,
        message: message.into(),
    }
}

fn transport_err(action: &'static str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        action,
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
