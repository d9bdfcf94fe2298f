//! Blocking client for the TeamCity REST API.
//!
//! All calls go to `<url>/app/rest/...` with `Accept: application/json` and,
//! when a token is configured, `Authorization: Bearer <token>`. A 404 maps
//! to [`ClientError::NotFound`]; any other failure is surfaced as-is.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use tcform_core::{
    BuildConfigId, BuildType, NewBuildType, NewProject, Project, ProjectId, ServerConfig,
    StepRecord, VcsRootEntry,
};

use crate::error::ClientError;
use crate::wire::{
    parameters_to_wire, BuildTypeBody, Locator, NewBuildTypeBody, NewProjectBody, ProjectBody,
    StepBody, StepsBody, VcsRootEntryBody, ROOT_PROJECT,
};
use crate::RemoteClient;

/// What a request is about, for error messages and 404 mapping.
struct Call<'a> {
    operation: &'static str,
    entity: &'static str,
    id: &'a str,
}

impl<'a> Call<'a> {
    fn new(operation: &'static str, entity: &'static str, id: &'a str) -> Self {
        Self {
            operation,
            entity,
            id,
        }
    }

    fn fail(&self, err: ureq::Error) -> ClientError {
        match err {
            ureq::Error::Status(404, _) => ClientError::not_found(self.entity, self.id),
            ureq::Error::Status(status, response) => ClientError::Status {
                operation: self.operation.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => ClientError::Transport {
                operation: self.operation.to_string(),
                message: transport.to_string(),
            },
        }
    }

    fn decode<T: DeserializeOwned>(&self, response: ureq::Response) -> Result<T, ClientError> {
        response.into_json().map_err(|source| ClientError::Decode {
            operation: self.operation.to_string(),
            source,
        })
    }
}

/// TeamCity REST client.
pub struct HttpClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(config: &ServerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}/app/rest/{path}", self.base_url);
        debug!(%method, %url, "teamcity request");
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn put_text(&self, call: &Call<'_>, path: &str, body: &str) -> Result<(), ClientError> {
        self.request("PUT", path)
            .set("Content-Type", "text/plain")
            .send_string(body)
            .map_err(|e| call.fail(e))?;
        Ok(())
    }
}

fn project_path(id: &ProjectId) -> String {
    format!("projects/id:{id}")
}

fn build_type_path(id: &BuildConfigId) -> String {
    format!("buildTypes/id:{id}")
}

impl RemoteClient for HttpClient {
    fn create_project(&self, project: &NewProject) -> Result<Project, ClientError> {
        let call = Call::new("create project", "project", &project.name);
        let body = NewProjectBody {
            name: project.name.clone(),
            parent_project: Locator {
                locator: ROOT_PROJECT.to_string(),
            },
        };
        let response = self
            .request("POST", "projects")
            .send_json(&body)
            .map_err(|e| call.fail(e))?;
        call.decode::<ProjectBody>(response).map(Project::from)
    }

    fn get_project(&self, id: &ProjectId) -> Result<Project, ClientError> {
        let call = Call::new("get project", "project", &id.0);
        let response = self
            .request("GET", &project_path(id))
            .call()
            .map_err(|e| call.fail(e))?;
        call.decode::<ProjectBody>(response).map(Project::from)
    }

    fn update_project(&self, project: &Project) -> Result<Project, ClientError> {
        let call = Call::new("update project", "project", &project.id.0);
        let path = project_path(&project.id);
        self.put_text(&call, &format!("{path}/description"), &project.description)?;
        self.request("PUT", &format!("{path}/parameters"))
            .send_json(&parameters_to_wire(&project.parameters))
            .map_err(|e| call.fail(e))?;
        self.get_project(&project.id)
    }

    fn delete_project(&self, id: &ProjectId) -> Result<(), ClientError> {
        let call = Call::new("delete project", "project", &id.0);
        self.request("DELETE", &project_path(id))
            .call()
            .map_err(|e| call.fail(e))?;
        Ok(())
    }

    fn create_build_type(&self, build_type: &NewBuildType) -> Result<BuildType, ClientError> {
        let call = Call::new(
            "create build configuration",
            "project",
            &build_type.project_id.0,
        );
        let body = NewBuildTypeBody {
            name: build_type.name.clone(),
            project_id: build_type.project_id.0.clone(),
        };
        let response = self
            .request("POST", "buildTypes")
            .send_json(&body)
            .map_err(|e| call.fail(e))?;
        call.decode::<BuildTypeBody>(response).map(BuildType::from)
    }

    fn get_build_type(&self, id: &BuildConfigId) -> Result<BuildType, ClientError> {
        let call = Call::new("get build configuration", "build configuration", &id.0);
        let response = self
            .request("GET", &build_type_path(id))
            .call()
            .map_err(|e| call.fail(e))?;
        call.decode::<BuildTypeBody>(response).map(BuildType::from)
    }

    fn update_build_type(&self, build_type: &BuildType) -> Result<BuildType, ClientError> {
        let call = Call::new(
            "update build configuration",
            "build configuration",
            &build_type.id.0,
        );
        let path = build_type_path(&build_type.id);
        self.put_text(
            &call,
            &format!("{path}/description"),
            &build_type.description,
        )?;
        self.request("PUT", &format!("{path}/parameters"))
            .send_json(&parameters_to_wire(&build_type.parameters))
            .map_err(|e| call.fail(e))?;
        self.get_build_type(&build_type.id)
    }

    fn delete_build_type(&self, id: &BuildConfigId) -> Result<(), ClientError> {
        let call = Call::new("delete build configuration", "build configuration", &id.0);
        self.request("DELETE", &build_type_path(id))
            .call()
            .map_err(|e| call.fail(e))?;
        Ok(())
    }

    fn attach_vcs_root_entry(
        &self,
        id: &BuildConfigId,
        entry: &VcsRootEntry,
    ) -> Result<VcsRootEntry, ClientError> {
        let call = Call::new("attach VCS root", "build configuration", &id.0);
        let response = self
            .request("POST", &format!("{}/vcs-root-entries", build_type_path(id)))
            .send_json(&VcsRootEntryBody::from(entry))
            .map_err(|e| call.fail(e))?;
        call.decode::<VcsRootEntryBody>(response)
            .map(VcsRootEntry::from)
    }

    fn add_step(&self, id: &BuildConfigId, step: &StepRecord) -> Result<StepRecord, ClientError> {
        let call = Call::new("add step", "build configuration", &id.0);
        let response = self
            .request("POST", &format!("{}/steps", build_type_path(id)))
            .send_json(&StepBody::from(step))
            .map_err(|e| call.fail(e))?;
        call.decode::<StepBody>(response).map(StepRecord::from)
    }

    fn get_steps(&self, id: &BuildConfigId) -> Result<Vec<StepRecord>, ClientError> {
        let call = Call::new("get steps", "build configuration", &id.0);
        let response = self
            .request("GET", &format!("{}/steps", build_type_path(id)))
            .call()
            .map_err(|e| call.fail(e))?;
        let body: StepsBody = call.decode(response)?;
        Ok(body.step.into_iter().map(StepRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = HttpClient::new(&ServerConfig::new("http://tc.local:8111/"));
        assert_eq!(client.base_url, "http://tc.local:8111");
    }

    #[test]
    fn paths_use_id_locators() {
        assert_eq!(project_path(&"App".into()), "projects/id:App");
        assert_eq!(build_type_path(&"App_Build".into()), "buildTypes/id:App_Build");
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let mut config = ServerConfig::new("http://127.0.0.1:9");
        config.timeout_secs = 2;
        let err = HttpClient::new(&config)
            .get_project(&"App".into())
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
    }
}
