use crate::backend::Backend;
use crate::store::Session;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Dashboard,
    Focus(String),
}

impl Route {
    /// `/` and `/focus/:id`. Anything else is the dashboard.
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["focus", id] => Route::Focus((*id).to_string()),
            _ => Route::Dashboard,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::Focus(id) => format!("/focus/{id}"),
        }
    }
}

/// What the shell should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Dashboard,
    Focus(String),
}

impl Screen {
    /// Without a session every route shows the auth screen. A focus route
    /// for a task the user cannot fetch falls back to the dashboard.
    pub fn resolve(backend: &dyn Backend, session: Option<&Session>, route: &Route) -> Self {
        let Some(session) = session else {
            return Screen::Auth;
        };
        match route {
            Route::Dashboard => Screen::Dashboard,
            Route::Focus(id) => match backend.get_task(id) {
                Ok(Some(task)) if task.user_id == session.user.id => Screen::Focus(id.clone()),
                Ok(_) => Screen::Dashboard,
                Err(e) => {
                    tracing::error!(task = %id, "failed to load focus task: {e}");
                    Screen::Dashboard
                }
            },
        }
    }
}
