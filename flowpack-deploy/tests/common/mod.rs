//! Shared fixtures for flowpack-deploy integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use flowpack_remote::{RemoteError, Schedule, Session};

/// In-memory Azkaban that records calls in order.
#[derive(Default)]
pub struct RecordingSession {
    pub projects: RefCell<BTreeSet<String>>,
    pub schedules: RefCell<BTreeMap<(String, String), String>>,
    pub uploads: RefCell<Vec<(String, String, Vec<u8>)>>,
    pub calls: RefCell<Vec<String>>,
    /// Flow whose scheduling is rejected by the server.
    pub reject_flow: Option<String>,
}

impl RecordingSession {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn cron(&self, project: &str, flow: &str) -> Option<String> {
        self.schedules
            .borrow()
            .get(&(project.to_string(), flow.to_string()))
            .cloned()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Session for RecordingSession {
    fn list_projects(&self) -> Result<BTreeSet<String>, RemoteError> {
        self.record("list".into());
        Ok(self.projects.borrow().clone())
    }

    fn create_project(&self, name: &str, description: &str) -> Result<(), RemoteError> {
        self.record(format!("create {name}: {description}"));
        self.projects.borrow_mut().insert(name.into());
        Ok(())
    }

    fn upload_project(&self, name: &str, file_name: &str, archive: &[u8]) -> Result<(), RemoteError> {
        self.record(format!("upload {name} {file_name}"));
        self.uploads
            .borrow_mut()
            .push((name.into(), file_name.into(), archive.to_vec()));
        Ok(())
    }

    fn get_schedule(&self, project: &str, flow: &str) -> Result<Schedule, RemoteError> {
        self.record(format!("get {flow}"));
        match self.cron(project, flow) {
            Some(cron) => Ok(Schedule {
                id: Some("1".into()),
                cron_expression: Some(cron),
            }),
            None => Err(RemoteError::NotFound {
                action: "fetch schedule",
                message: "flow has no schedule".into(),
            }),
        }
    }

    fn schedule_cron(&self, project: &str, flow: &str, cron: &str) -> Result<(), RemoteError> {
        self.record(format!("schedule {flow} {cron}"));
        if self.reject_flow.as_deref() == Some(flow) {
            return Err(RemoteError::Api {
                action: "schedule flow",
                message: "Permission denied".into(),
            });
        }
        self.schedules
            .borrow_mut()
            .insert((project.into(), flow.into()), cron.into());
        Ok(())
    }

    fn unschedule(&self, project: &str, flow: &str) -> Result<(), RemoteError> {
        self.record(format!("unschedule {flow}"));
        self.schedules
            .borrow_mut()
            .remove(&(project.to_string(), flow.to_string()));
        Ok(())
    }
}
