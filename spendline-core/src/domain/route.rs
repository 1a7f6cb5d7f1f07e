//! Navigation targets and the auth guard in front of them

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Root,
    Login,
    Signup,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Unknown paths fall back to the default route
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/dashboard" => Route::Dashboard,
            _ => Route::Root,
        }
    }

    /// Where a request for this route actually lands
    pub fn resolve(self, authenticated: bool) -> Route {
        match (self, authenticated) {
            (Route::Root, true) | (Route::Login, true) | (Route::Signup, true) => Route::Dashboard,
            (Route::Root, false) | (Route::Dashboard, false) => Route::Login,
            (route, _) => route,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard() {
        assert_eq!(Route::Root.resolve(true), Route::Dashboard);
        assert_eq!(Route::Root.resolve(false), Route::Login);
        assert_eq!(Route::Login.resolve(true), Route::Dashboard);
        assert_eq!(Route::Signup.resolve(false), Route::Signup);
        assert_eq!(Route::Dashboard.resolve(false), Route::Login);
        assert_eq!(Route::Dashboard.resolve(true), Route::Dashboard);
    }

    #[test]
    fn test_paths() {
        assert_eq!(Route::from_path("/dashboard/"), Route::Dashboard);
        assert_eq!(Route::from_path("/nowhere"), Route::Root);
        assert_eq!(Route::from_path(""), Route::Root);
        assert_eq!(Route::Signup.to_string(), "/signup");
    }
}
