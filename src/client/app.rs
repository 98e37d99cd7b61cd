use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::client::catalog::{GridView, filter_packages, render_grid};
use crate::client::session::{Session, SessionStorage, clear_session, load_session, save_session};
use crate::db::models::{DbPackage, Role};
use crate::error::ClientError;
use crate::types::api::{LoginRequest, LoginResponse};
use crate::worker::{PageId, Request, Response, ServiceHost};

/// Page the client sends people to after logout.
pub const LOGIN_PAGE: &str = "login.html";
pub const DEVELOPER_PAGE: &str = "developer.html";
pub const ADMIN_PAGE: &str = "admin.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// Package upload.
    Developer,
    /// Review queue and catalog moderation.
    Admin,
}

impl Console {
    pub fn page(self) -> &'static str {
        match self {
            Console::Developer => DEVELOPER_PAGE,
            Console::Admin => ADMIN_PAGE,
        }
    }
}

/// Which console buttons a page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavVisibility {
    pub developer_console: bool,
    pub admin_console: bool,
}

impl NavVisibility {
    pub fn allows(&self, console: Console) -> bool {
        match console {
            Console::Developer => self.developer_console,
            Console::Admin => self.admin_console,
        }
    }

    pub fn for_session(session: Option<&Session>) -> Self {
        match session.map(|s| s.role) {
            Some(Role::Admin) => Self {
                developer_console: true,
                admin_console: true,
            },
            Some(Role::Developer) => Self {
                developer_console: true,
                admin_console: false,
            },
            Some(Role::User) | None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Redirect(String),
}

#[derive(Deserialize)]
struct FailureBody {
    message: Option<String>,
}

/// One storefront page: its session storage, the approved package list it
/// loaded, and the worker host its fetches go through.
pub struct ClientApp {
    host: ServiceHost,
    page: PageId,
    origin: Url,
    storage: Box<dyn SessionStorage>,
    apps: Vec<DbPackage>,
}

impl ClientApp {
    pub async fn open(host: ServiceHost, origin: Url, storage: Box<dyn SessionStorage>) -> Self {
        let page = host.open_page().await;
        Self {
            host,
            page,
            origin,
            storage,
            apps: Vec::new(),
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn storage(&self) -> &dyn SessionStorage {
        self.storage.as_ref()
    }

    pub fn session(&self) -> Option<Session> {
        load_session(self.storage.as_ref())
    }

    pub fn nav(&self) -> NavVisibility {
        NavVisibility::for_session(self.session().as_ref())
    }

    pub fn apps(&self) -> &[DbPackage] {
        &self.apps
    }

    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let response = self.host.fetch(self.page, request).await?;
        if !response.ok() {
            let message = serde_json::from_slice::<FailureBody>(&response.body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("request failed with status {}", response.status));
            return Err(ClientError::Rejected {
                status: response.status,
                message,
            });
        }
        Ok(response)
    }

    /// Fetch the approved packages and keep them for rendering and search.
    pub async fn load_apps(&mut self) -> Result<&[DbPackage], ClientError> {
        let response = self.send(Request::get(self.origin.join("/apps")?)).await?;
        self.apps = serde_json::from_slice(&response.body)?;
        debug!(count = self.apps.len(), "apps loaded");
        Ok(&self.apps)
    }

    /// Authenticate and remember the session locally.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session, ClientError> {
        let body = serde_json::to_vec(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self
            .send(Request::post_json(self.origin.join("/login")?, body))
            .await?;
        let login: LoginResponse = serde_json::from_slice(&response.body)?;
        let session = Session {
            username: login.username,
            role: login.role,
        };
        save_session(self.storage.as_mut(), &session)?;
        info!(username = %session.username, role = %session.role, "signed in");
        Ok(session)
    }

    /// Local-only logout: drop the session and go to the login page.
    pub fn logout(&mut self) -> Navigation {
        clear_session(self.storage.as_mut());
        Navigation::Redirect(LOGIN_PAGE.to_string())
    }

    /// Follow a console button. Without the role for it the page goes to login.
    pub fn open_console(&self, console: Console) -> Navigation {
        if self.nav().allows(console) {
            Navigation::Redirect(console.page().to_string())
        } else {
            debug!(?console, "console not available for this session");
            Navigation::Redirect(LOGIN_PAGE.to_string())
        }
    }

    /// Review queue of the admin console.
    pub async fn load_pending(&self) -> Result<Vec<DbPackage>, ClientError> {
        let response = self
            .send(Request::get(self.origin.join("/pending-apps")?))
            .await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn approve(&self, id: i64) -> Result<(), ClientError> {
        self.post_id("/approve-app", id).await?;
        info!(id, "app approved");
        Ok(())
    }

    pub async fn reject(&self, id: i64) -> Result<(), ClientError> {
        self.post_id("/reject-app", id).await?;
        info!(id, "app rejected");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let url = self.origin.join(&format!("/apps/{id}"))?;
        self.send(Request::delete(url)).await?;
        info!(id, "app deleted");
        Ok(())
    }

    async fn post_id(&self, path: &str, id: i64) -> Result<Response, ClientError> {
        let body = serde_json::to_vec(&serde_json::json!({ "id": id }))?;
        self.send(Request::post_json(self.origin.join(path)?, body))
            .await
    }

    pub fn search(&self, query: &str) -> Vec<&DbPackage> {
        filter_packages(&self.apps, query)
    }

    pub fn render(&self, query: &str) -> GridView {
        render_grid(&self.search(query))
    }

    pub async fn close(self) {
        self.host.close_page(self.page).await;
    }
}
